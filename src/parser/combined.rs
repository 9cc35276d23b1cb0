// parse combined log format
// <ip> <ident> <user> [<time>] "<method> <path> HTTP/<ver>" <status> <bytes> "<referer>" "<user-agent>"

use regex::Regex;

use super::{clf_date_parse, HttpMethod, LogParser, LogRecord, MalformedKind, MalformedLineError};
use crate::client::ClientProfile;

const COMBINED_PATTERN: &str =
    r#"^(\S+) \S+ \S+ \[([^\]]*)\] "(\S+) (.*?) HTTP/[^"]*" (\d+) (\d+) "([^"]*)" "([^"]*)""#;

pub struct CombinedParser {
    pattern: Regex,
}

impl Default for CombinedParser {
    fn default() -> Self {
        CombinedParser {
            pattern: Regex::new(COMBINED_PATTERN).expect("combined log pattern is valid"),
        }
    }
}

impl LogParser for CombinedParser {
    fn parse(&self, line: &str) -> Result<LogRecord, MalformedLineError> {
        let malformed = |kind| MalformedLineError::new(kind, line);

        let caps = self
            .pattern
            .captures(line)
            .ok_or_else(|| malformed(MalformedKind::NoMatch))?;
        // all groups are mandatory in the pattern, so indexing cannot miss
        let client = &caps[1];
        let time = clf_date_parse(&caps[2]).ok_or_else(|| malformed(MalformedKind::Timestamp))?;
        let method = HttpMethod::from_token(&caps[3]);
        let path = &caps[4];
        let status: u16 = caps[5]
            .parse()
            .map_err(|_| malformed(MalformedKind::Status))?;
        let size: u64 = caps[6]
            .parse()
            .map_err(|_| malformed(MalformedKind::Size))?;
        let referer = match &caps[7] {
            "-" => None,
            r => Some(r.to_string()),
        };
        let user_agent = &caps[8];
        tracing::trace!("parsed {} {} {} from {}", method, path, status, client);

        Ok(LogRecord {
            client: client.to_string(),
            time,
            method,
            path: path.to_string(),
            status,
            size,
            referer,
            user_agent: user_agent.to_string(),
            client_profile: ClientProfile::from_user_agent(user_agent),
        })
    }
}
