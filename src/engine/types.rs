use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Domain,
    Ip,
    Url,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Domain => write!(f, "domain"),
            AssetKind::Ip => write!(f, "ip"),
            AssetKind::Url => write!(f, "url"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub hostname: String,
    pub ips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRecord {
    pub address: String,
    pub domains: Vec<String>,
}

/// A URL keyed by its query-less form; distinct query strings accumulate in
/// `query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub hostname: String,
    pub port: u16,
    pub status: Option<u16>,
    pub content_length: Option<u64>,
    pub query: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Domain(DomainRecord),
    Ip(IpRecord),
    Url(UrlRecord),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Domain(_) => AssetKind::Domain,
            Asset::Ip(_) => AssetKind::Ip,
            Asset::Url(_) => AssetKind::Url,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Asset::Domain(d) => &d.hostname,
            Asset::Ip(ip) => &ip.address,
            Asset::Url(u) => &u.url,
        }
    }
}

/// Appends the values of `extra` missing from `target`, keeping order.
pub fn merge_unique(target: &mut Vec<String>, extra: impl IntoIterator<Item = String>) {
    for value in extra {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}
