use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;

use crate::client::ClientProfile;

pub mod combined;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Unknown,
}

impl HttpMethod {
    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            "PATCH" => HttpMethod::Patch,
            _ => HttpMethod::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub client: String,
    pub time: DateTime<FixedOffset>,
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    pub size: u64,
    pub referer: Option<String>,
    pub user_agent: String,
    pub client_profile: ClientProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    NoMatch,
    Timestamp,
    Status,
    Size,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MalformedKind::NoMatch => "line does not match the combined log format",
            MalformedKind::Timestamp => "invalid timestamp",
            MalformedKind::Status => "invalid status code",
            MalformedKind::Size => "invalid response size",
        };
        f.write_str(s)
    }
}

/// The line could not be turned into a [`LogRecord`]. Callers skip it and carry on.
#[derive(Debug, Clone, Error)]
#[error("malformed log line ({kind}): {line}")]
pub struct MalformedLineError {
    pub kind: MalformedKind,
    pub line: String,
}

impl MalformedLineError {
    pub fn new(kind: MalformedKind, line: &str) -> Self {
        MalformedLineError {
            kind,
            line: line.to_string(),
        }
    }
}

pub trait LogParser {
    fn parse(&self, line: &str) -> Result<LogRecord, MalformedLineError>;
}

const CLF_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn clf_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Parse `dd/Mon/yyyy:HH:MM:SS +hhmm`, e.g. `10/Oct/2023:13:55:36 +0000`.
pub(crate) fn clf_date_parse(s: &str) -> Option<DateTime<FixedOffset>> {
    if s.len() != 26 || !s.is_ascii() {
        return None;
    }
    let b = s.as_bytes();
    if b[2] != b'/' || b[6] != b'/' || b[11] != b':' || b[14] != b':' || b[17] != b':' {
        return None;
    }
    if b[20] != b' ' {
        return None;
    }

    let day: u32 = clf_digits(&s[0..2])?;
    let month = CLF_MONTHS.iter().position(|m| *m == &s[3..6])? as u32 + 1;
    let year: i32 = clf_digits(&s[7..11])?;
    let hour: u32 = clf_digits(&s[12..14])?;
    let minute: u32 = clf_digits(&s[15..17])?;
    let second: u32 = clf_digits(&s[18..20])?;

    let timezone_sign = match &s[21..22] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let timezone_hour: i32 = clf_digits(&s[22..24])?;
    let timezone_minute: i32 = clf_digits(&s[24..26])?;
    let timezone_offset = timezone_sign * (timezone_hour * 3600 + timezone_minute * 60);
    let timezone = FixedOffset::east_opt(timezone_offset)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .and_then(|date| date.and_local_timezone(timezone).single())
}
