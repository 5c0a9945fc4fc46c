use super::grammar::{clean_hostname, is_domain, is_ip};
use super::scope::{Rejection, ScopeSnapshot};
use super::types::{merge_unique, UrlRecord};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Turns raw URL lines (`<url> [<status> <content_length>]`) into
/// [`UrlRecord`]s.
///
/// Accepted forms: absolute (`https://host:8443/a`), scheme-less
/// (`host/a`), protocol relative (`//host/a`) and path relative (`/a`,
/// requires a hostname override).
pub struct UrlNormalizer<'a> {
    scope: &'a ScopeSnapshot,
    hostname_override: Option<String>,
}

/// Shape of the URL part once a scheme has been settled.
enum Parsed {
    Absolute(Url),
    ProtocolRelative(Url),
    Relative,
}

impl<'a> UrlNormalizer<'a> {
    pub fn new(scope: &'a ScopeSnapshot, hostname_override: Option<&str>) -> Self {
        Self {
            scope,
            hostname_override: hostname_override
                .map(clean_hostname)
                .filter(|h| !h.is_empty()),
        }
    }

    pub fn normalize(&self, token: &str) -> Result<UrlRecord, Rejection> {
        let fields: Vec<&str> = token.split_whitespace().collect();
        let Some(first) = fields.first() else {
            return Err(Rejection::Malformed);
        };

        let (status, content_length) = match fields[..] {
            [_, status, length] => match (status.parse::<u16>(), length.parse::<u64>()) {
                (Ok(status), Ok(length)) => (Some(status), Some(length)),
                _ => {
                    debug!("Ignoring unparsable status/length in '{}'", token);
                    (None, None)
                }
            },
            _ => (None, None),
        };

        let raw = if has_http_scheme(first) || first.starts_with('/') {
            first.to_string()
        } else {
            format!("http://{}", first)
        };

        let parsed = if let Some(rest) = raw.strip_prefix("//") {
            Parsed::ProtocolRelative(
                Url::parse(&format!("http://{}", rest)).map_err(|_| Rejection::Malformed)?,
            )
        } else if raw.starts_with('/') {
            Parsed::Relative
        } else {
            Parsed::Absolute(Url::parse(&raw).map_err(|_| Rejection::Malformed)?)
        };

        let parsed_host = match &parsed {
            Parsed::Absolute(u) | Parsed::ProtocolRelative(u) => {
                u.host_str().filter(|h| !h.is_empty()).map(str::to_string)
            }
            Parsed::Relative => None,
        };

        let hostname = match (&self.hostname_override, &parsed_host) {
            (Some(forced), Some(found)) if forced != found => {
                warn!(
                    "Provided hostname {} did not match parsed hostname {}, skipping {}",
                    forced, found, raw
                );
                return Err(Rejection::AmbiguousHost);
            }
            (Some(forced), _) => forced.clone(),
            (None, Some(found)) => found.clone(),
            (None, None) => {
                warn!("Hostname could not be parsed, skipping {}", raw);
                return Err(Rejection::AmbiguousHost);
            }
        };

        let (full, port) = match &parsed {
            Parsed::Relative => (format!("http://{}{}", hostname, raw), DEFAULT_HTTP_PORT),
            Parsed::ProtocolRelative(u) => (
                format!("http:{}", raw),
                u.port().unwrap_or(DEFAULT_HTTP_PORT),
            ),
            Parsed::Absolute(u) => {
                let port = u.port().unwrap_or(match u.scheme() {
                    "https" => DEFAULT_HTTPS_PORT,
                    _ => DEFAULT_HTTP_PORT,
                });
                (raw.clone(), port)
            }
        };

        let (url, query) = match full.split_once('?') {
            Some((base, query)) => {
                let query = query.split('#').next().unwrap_or_default();
                (base.to_string(), Some(query.to_string()).filter(|q| !q.is_empty()))
            }
            None => (full, None),
        };

        if !is_domain(&hostname) && !is_ip(&hostname) {
            return Err(Rejection::Malformed);
        }
        self.scope.admit_host(&hostname)?;

        Ok(UrlRecord {
            url,
            hostname,
            port,
            status,
            content_length,
            query: query.into_iter().collect(),
        })
    }
}

fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// URLs admitted during one batch, collapsed on the query-less URL.
#[derive(Debug, Default)]
pub struct UrlBatch {
    records: Vec<UrlRecord>,
    index: FxHashMap<String, usize>,
}

impl UrlBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, or folds it into the one already held for the same
    /// URL. Returns `true` when the URL was not seen before.
    pub fn push(&mut self, record: UrlRecord) -> bool {
        match self.index.get(&record.url) {
            Some(&idx) => {
                let existing = &mut self.records[idx];
                merge_unique(&mut existing.query, record.query);
                if record.status.is_some() {
                    existing.status = record.status;
                    existing.content_length = record.content_length;
                }
                false
            }
            None => {
                self.index.insert(record.url.clone(), self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    pub fn into_records(self) -> Vec<UrlRecord> {
        self.records
    }
}
