use std::{
    collections::{HashMap, HashSet},
    sync::OnceLock,
};

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::client::{BrowserFamily, OsFamily};
use crate::parser::LogRecord;

/// Running aggregate over one analysis run.
///
/// Records are folded in one at a time with [`Statistics::fold`]; every derived
/// metric is computed from the current state on demand and never fails, even
/// before the first record arrives.
#[derive(Debug, Default, Clone)]
pub struct Statistics {
    record_count: u64,
    non_bot_visits: u64,
    error_count: u64,
    total_bytes: u64,
    time_range: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
    os_counts: HashMap<OsFamily, u64>,
    browser_counts: HashMap<BrowserFamily, u64>,
    existing_paths: HashSet<String>,
    not_found_paths: HashSet<String>,
    non_bot_clients: HashSet<String>,
    visits_per_second: HashMap<i64, u64>,
    visits_per_client: HashMap<String, u64>,
    referer_domains: HashSet<String>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, record: &LogRecord) {
        self.record_count += 1;
        self.total_bytes = self.total_bytes.saturating_add(record.size);

        self.time_range = Some(match self.time_range {
            None => (record.time, record.time),
            Some((min, max)) => (min.min(record.time), max.max(record.time)),
        });

        let profile = &record.client_profile;
        *self.os_counts.entry(profile.os).or_default() += 1;
        *self.browser_counts.entry(profile.browser).or_default() += 1;

        match record.status {
            200 => {
                self.existing_paths.insert(record.path.clone());
            }
            404 => {
                self.not_found_paths.insert(record.path.clone());
            }
            _ => {}
        }

        if !profile.is_bot {
            self.non_bot_visits += 1;
            self.non_bot_clients.insert(record.client.clone());
            *self
                .visits_per_second
                .entry(record.time.timestamp())
                .or_default() += 1;
            *self
                .visits_per_client
                .entry(record.client.clone())
                .or_default() += 1;
        }

        if let Some(referer) = record.referer.as_deref() {
            match referer_domain(referer) {
                Some(domain) => {
                    self.referer_domains.insert(domain);
                }
                None => tracing::debug!("no domain in referer {:?}", referer),
            }
        }

        if (400..=599).contains(&record.status) {
            self.error_count += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.time_range.is_none()
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn non_bot_visits(&self) -> u64 {
        self.non_bot_visits
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn time_range(&self) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        self.time_range
    }

    pub fn unique_non_bot_clients(&self) -> usize {
        self.non_bot_clients.len()
    }

    pub fn os_counts(&self) -> &HashMap<OsFamily, u64> {
        &self.os_counts
    }

    pub fn browser_counts(&self) -> &HashMap<BrowserFamily, u64> {
        &self.browser_counts
    }

    pub fn existing_paths(&self) -> &HashSet<String> {
        &self.existing_paths
    }

    pub fn not_found_paths(&self) -> &HashSet<String> {
        &self.not_found_paths
    }

    pub fn referer_domains(&self) -> &HashSet<String> {
        &self.referer_domains
    }

    /// Whole hours (truncated) between the earliest and latest record.
    fn hours_spanned(&self) -> Option<i64> {
        self.time_range
            .map(|(min, max)| max.signed_duration_since(min).num_hours())
    }

    // An empty aggregate or zero count gives 0; a span under one hour gives the raw count.
    fn per_hour(&self, count: u64) -> f64 {
        match self.hours_spanned() {
            None => 0.0,
            Some(_) if count == 0 => 0.0,
            Some(0) => count as f64,
            Some(hours) => count as f64 / hours as f64,
        }
    }

    /// Bytes sent per hour.
    pub fn traffic_rate(&self) -> f64 {
        self.per_hour(self.total_bytes)
    }

    pub fn average_visits_per_hour(&self) -> f64 {
        self.per_hour(self.non_bot_visits)
    }

    pub fn average_errors_per_hour(&self) -> f64 {
        self.per_hour(self.error_count)
    }

    pub fn average_visits_per_user(&self) -> f64 {
        if self.non_bot_clients.is_empty() {
            return 0.0;
        }
        self.non_bot_visits as f64 / self.non_bot_clients.len() as f64
    }

    pub fn os_share(&self) -> HashMap<OsFamily, f64> {
        shares(&self.os_counts)
    }

    pub fn browser_share(&self) -> HashMap<BrowserFamily, f64> {
        shares(&self.browser_counts)
    }

    pub fn peak_visits_per_second(&self) -> u64 {
        self.visits_per_second.values().copied().max().unwrap_or(0)
    }

    pub fn max_visits_per_user(&self) -> u64 {
        self.visits_per_client.values().copied().max().unwrap_or(0)
    }
}

impl<'a> Extend<&'a LogRecord> for Statistics {
    fn extend<T: IntoIterator<Item = &'a LogRecord>>(&mut self, iter: T) {
        for record in iter {
            self.fold(record);
        }
    }
}

fn shares<K: Copy + Eq + std::hash::Hash>(counts: &HashMap<K, u64>) -> HashMap<K, f64> {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return HashMap::new();
    }
    counts
        .iter()
        .map(|(k, v)| (*k, *v as f64 / total as f64))
        .collect()
}

fn domain_pattern() -> &'static Regex {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    DOMAIN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("domain pattern is valid")
    })
}

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Best-effort host extraction from a referer.
///
/// Full URLs yield their host; anything else is searched for a domain-shaped
/// fragment between `&`, `?` and `=`. A leading `www.` is dropped.
pub fn referer_domain(referer: &str) -> Option<String> {
    if referer.trim().is_empty() || referer == "-" {
        return None;
    }

    if referer.contains("://") {
        // whitespace anywhere makes this an invalid URI, not a host to salvage
        if referer.contains(char::is_whitespace) {
            return None;
        }
        let url = url::Url::parse(referer).ok()?;
        if let Some(host) = url.host_str() {
            return Some(strip_www(host));
        }
    }

    if referer.contains('.') {
        return referer
            .split(['&', '?', '='])
            .map(str::trim)
            .find(|part| domain_pattern().is_match(part))
            .map(strip_www);
    }

    None
}
