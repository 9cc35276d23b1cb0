use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::stats::Statistics;

/// Point-in-time snapshot of every derived metric, with stable ordering.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub records: u64,
    pub non_bot_visits: u64,
    pub error_requests: u64,
    pub unique_non_bot_clients: usize,
    pub total_traffic: u64,
    pub first_seen: Option<DateTime<FixedOffset>>,
    pub last_seen: Option<DateTime<FixedOffset>>,
    pub traffic_rate: f64,
    pub average_visits_per_hour: f64,
    pub average_errors_per_hour: f64,
    pub average_visits_per_user: f64,
    pub peak_visits_per_second: u64,
    pub max_visits_per_user: u64,
    pub os_counts: BTreeMap<&'static str, u64>,
    pub browser_counts: BTreeMap<&'static str, u64>,
    pub os_share: BTreeMap<&'static str, f64>,
    pub browser_share: BTreeMap<&'static str, f64>,
    pub existing_paths: Vec<String>,
    pub not_found_paths: Vec<String>,
    pub referer_domains: Vec<String>,
}

fn by_label<K, V: Copy>(
    map: &HashMap<K, V>,
    label: impl Fn(&K) -> &'static str,
) -> BTreeMap<&'static str, V> {
    map.iter().map(|(k, v)| (label(k), *v)).collect()
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut v: Vec<_> = set.iter().cloned().collect();
    v.sort();
    v
}

impl Report {
    pub fn from_statistics(stats: &Statistics) -> Self {
        let (first_seen, last_seen) = match stats.time_range() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        Report {
            records: stats.record_count(),
            non_bot_visits: stats.non_bot_visits(),
            error_requests: stats.error_count(),
            unique_non_bot_clients: stats.unique_non_bot_clients(),
            total_traffic: stats.total_bytes(),
            first_seen,
            last_seen,
            traffic_rate: stats.traffic_rate(),
            average_visits_per_hour: stats.average_visits_per_hour(),
            average_errors_per_hour: stats.average_errors_per_hour(),
            average_visits_per_user: stats.average_visits_per_user(),
            peak_visits_per_second: stats.peak_visits_per_second(),
            max_visits_per_user: stats.max_visits_per_user(),
            os_counts: by_label(stats.os_counts(), |k| k.label()),
            browser_counts: by_label(stats.browser_counts(), |k| k.label()),
            os_share: by_label(&stats.os_share(), |k| k.label()),
            browser_share: by_label(&stats.browser_share(), |k| k.label()),
            existing_paths: sorted(stats.existing_paths()),
            not_found_paths: sorted(stats.not_found_paths()),
            referer_domains: sorted(stats.referer_domains()),
        }
    }
}

fn write_shares(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    counts: &BTreeMap<&'static str, u64>,
    shares: &BTreeMap<&'static str, f64>,
) -> fmt::Result {
    writeln!(f, "{}:", title)?;
    for (label, share) in shares {
        let count = counts.get(label).copied().unwrap_or_default();
        writeln!(f, "  {:<10} {:>8} ({:.2}%)", label, count, share * 100.0)?;
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    writeln!(f, "{} ({}):", title, items.len())?;
    for item in items {
        writeln!(f, "  {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records: {}", self.records)?;
        if let (Some(first), Some(last)) = (self.first_seen, self.last_seen) {
            writeln!(f, "Time range: {} .. {}", first.to_rfc3339(), last.to_rfc3339())?;
        }
        writeln!(
            f,
            "Total traffic: {} ({} per hour)",
            humansize::format_size(self.total_traffic, humansize::BINARY),
            humansize::format_size(self.traffic_rate as u64, humansize::BINARY)
        )?;
        writeln!(
            f,
            "Non-bot visits: {} from {} clients",
            self.non_bot_visits, self.unique_non_bot_clients
        )?;
        writeln!(f, "Average visits per hour: {:.2}", self.average_visits_per_hour)?;
        writeln!(f, "Average visits per user: {:.2}", self.average_visits_per_user)?;
        writeln!(f, "Peak visits per second: {}", self.peak_visits_per_second)?;
        writeln!(f, "Max visits per user: {}", self.max_visits_per_user)?;
        writeln!(
            f,
            "Error requests: {} ({:.2} per hour)",
            self.error_requests, self.average_errors_per_hour
        )?;
        write_shares(f, "Operating systems", &self.os_counts, &self.os_share)?;
        write_shares(f, "Browsers", &self.browser_counts, &self.browser_share)?;
        write_list(f, "Existing pages", &self.existing_paths)?;
        write_list(f, "Not found pages", &self.not_found_paths)?;
        write_list(f, "Referer domains", &self.referer_domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{combined::CombinedParser, LogParser};
    use test_log::test;

    fn sample() -> Statistics {
        let parser = CombinedParser::default();
        let mut stats = Statistics::new();
        for line in [
            r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "https://www.search.example/?q=1" "Mozilla/5.0 (Windows NT 10.0) Chrome/118.0""#,
            r#"10.0.0.2 - - [10/Oct/2023:14:10:00 +0000] "GET /missing HTTP/1.1" 404 0 "-" "Googlebot/2.1 (+http://www.google.com/bot.html)""#,
            r#"10.0.0.3 - - [10/Oct/2023:14:10:00 +0000] "GET /about HTTP/1.1" 200 1024 "-" "Mozilla/5.0 (Macintosh) Safari/605.1""#,
        ] {
            stats.fold(&parser.parse(line).unwrap());
        }
        stats
    }

    #[test]
    fn test_report_from_statistics() {
        let report = Report::from_statistics(&sample());
        assert_eq!(report.records, 3);
        assert_eq!(report.non_bot_visits, 2);
        assert_eq!(report.error_requests, 1);
        assert_eq!(report.total_traffic, 1536);
        assert_eq!(report.existing_paths, vec!["/about", "/index.html"]);
        assert_eq!(report.not_found_paths, vec!["/missing"]);
        assert_eq!(report.referer_domains, vec!["search.example"]);
        assert_eq!(report.os_counts.get("macOS"), Some(&1));
        assert_eq!(report.browser_counts.get("Other"), Some(&1));
        assert_eq!(
            report.first_seen.map(|t| t.to_rfc3339()).as_deref(),
            Some("2023-10-10T13:55:36+00:00")
        );
    }

    #[test]
    fn test_empty_report() {
        let report = Report::from_statistics(&Statistics::new());
        assert_eq!(report.records, 0);
        assert!(report.first_seen.is_none());
        assert!(report.os_share.is_empty());
        assert!(report.to_string().contains("Records: 0"));
    }

    #[test]
    fn test_report_json() {
        let json = serde_json::to_value(Report::from_statistics(&sample())).unwrap();
        assert_eq!(json["records"].as_u64(), Some(3));
        assert_eq!(json["os_counts"]["Windows"].as_u64(), Some(1));
        assert_eq!(json["not_found_paths"][0], "/missing");
        assert_eq!(json["peak_visits_per_second"].as_u64(), Some(1));
    }

    #[test]
    fn test_report_text() {
        let text = Report::from_statistics(&sample()).to_string();
        assert!(text.contains("Records: 3"));
        assert!(text.contains("Total traffic: 1.50 KiB"));
        assert!(text.contains("Not found pages (1):\n  /missing"));
    }
}
