// Heuristic user-agent classification.
// Every rule is a lowercase substring; the first one that hits decides the family.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BrowserFamily {
    Edge,
    Firefox,
    Chrome,
    Safari,
    Opera,
    Other,
}

// Order matters: Android UAs also carry "linux", iOS ones carry "mac os x".
const OS_RULES: &[(&str, OsFamily)] = &[
    ("windows", OsFamily::Windows),
    ("mac", OsFamily::MacOs),
    ("linux", OsFamily::Linux),
    ("android", OsFamily::Android),
    ("ios", OsFamily::Ios),
];

// Edge ("Edg/") UAs contain both Chrome and Safari tokens, Chrome contains Safari.
const BROWSER_RULES: &[(&str, BrowserFamily)] = &[
    ("edg", BrowserFamily::Edge),
    ("firefox", BrowserFamily::Firefox),
    ("chrome", BrowserFamily::Chrome),
    ("safari", BrowserFamily::Safari),
    ("opera", BrowserFamily::Opera),
];

const BOT_MARKER: &str = "bot";

fn first_match<T: Copy>(haystack: &str, rules: &[(&str, T)], fallback: T) -> T {
    rules
        .iter()
        .find(|(needle, _)| haystack.contains(needle))
        .map(|(_, family)| *family)
        .unwrap_or(fallback)
}

impl OsFamily {
    pub fn label(&self) -> &'static str {
        match self {
            OsFamily::Windows => "Windows",
            OsFamily::MacOs => "macOS",
            OsFamily::Linux => "Linux",
            OsFamily::Android => "Android",
            OsFamily::Ios => "iOS",
            OsFamily::Unknown => "Unknown",
        }
    }
}

impl BrowserFamily {
    pub fn label(&self) -> &'static str {
        match self {
            BrowserFamily::Edge => "Edge",
            BrowserFamily::Firefox => "Firefox",
            BrowserFamily::Chrome => "Chrome",
            BrowserFamily::Safari => "Safari",
            BrowserFamily::Opera => "Opera",
            BrowserFamily::Other => "Other",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// OS, browser and bot flag guessed from a user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientProfile {
    pub os: OsFamily,
    pub browser: BrowserFamily,
    pub is_bot: bool,
}

impl Default for ClientProfile {
    fn default() -> Self {
        ClientProfile {
            os: OsFamily::Unknown,
            browser: BrowserFamily::Other,
            is_bot: false,
        }
    }
}

impl ClientProfile {
    /// Never fails: a missing user agent gets the fallback profile.
    pub fn classify(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) => Self::from_user_agent(ua),
            None => Self::default(),
        }
    }

    pub fn from_user_agent(user_agent: &str) -> Self {
        let lower = user_agent.to_lowercase();
        ClientProfile {
            os: first_match(&lower, OS_RULES, OsFamily::Unknown),
            browser: first_match(&lower, BROWSER_RULES, BrowserFamily::Other),
            is_bot: lower.contains(BOT_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_classify_desktop_browsers() {
        let chrome = ClientProfile::from_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0 Safari/537.36",
        );
        assert_eq!(chrome.os, OsFamily::Windows);
        assert_eq!(chrome.browser, BrowserFamily::Chrome);
        assert!(!chrome.is_bot);

        let firefox = ClientProfile::from_user_agent(
            "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0",
        );
        assert_eq!(firefox.os, OsFamily::Linux);
        assert_eq!(firefox.browser, BrowserFamily::Firefox);

        let safari = ClientProfile::from_user_agent(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        );
        assert_eq!(safari.os, OsFamily::MacOs);
        assert_eq!(safari.browser, BrowserFamily::Safari);
    }

    #[test]
    fn test_edge_wins_over_chrome() {
        let edge = ClientProfile::from_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36 Edg/118.0.2088.46",
        );
        assert_eq!(edge.browser, BrowserFamily::Edge);
    }

    #[test]
    fn test_os_priority_order() {
        // "linux" is checked before "android"
        let android = ClientProfile::from_user_agent(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/119.0 Mobile Safari/537.36",
        );
        assert_eq!(android.os, OsFamily::Linux);

        let bare_android = ClientProfile::from_user_agent("Dalvik/2.1.0 (U; Android 13)");
        assert_eq!(bare_android.os, OsFamily::Android);

        let ios_app = ClientProfile::from_user_agent("MyApp/3.2 iOS/17.1");
        assert_eq!(ios_app.os, OsFamily::Ios);
    }

    #[test]
    fn test_bot_detection_is_case_insensitive() {
        let google = ClientProfile::from_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)");
        assert!(google.is_bot);
        assert!(ClientProfile::from_user_agent("BINGBOT").is_bot);
        assert!(!ClientProfile::from_user_agent("curl/8.4.0").is_bot);
    }

    #[test]
    fn test_fallbacks() {
        for profile in [
            ClientProfile::classify(None),
            ClientProfile::classify(Some("")),
            ClientProfile::from_user_agent("-"),
        ] {
            assert_eq!(profile.os, OsFamily::Unknown);
            assert_eq!(profile.browser, BrowserFamily::Other);
            assert!(!profile.is_bot);
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        let ua = "Opera/9.80 (J2ME/MIDP; Opera Mini/9.80) Presto/2.12";
        assert_eq!(
            ClientProfile::from_user_agent(ua),
            ClientProfile::from_user_agent(ua)
        );
        assert_eq!(ClientProfile::from_user_agent(ua).browser, BrowserFamily::Opera);
    }

    #[test]
    fn test_labels() {
        assert_eq!(OsFamily::MacOs.to_string(), "macOS");
        assert_eq!(OsFamily::Ios.label(), "iOS");
        assert_eq!(BrowserFamily::Other.to_string(), "Other");
    }
}
