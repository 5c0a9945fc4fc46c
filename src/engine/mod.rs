//! Pure normalization and scope admission logic. Nothing in here performs
//! I/O; the pipeline feeds it snapshots read from a store.

pub mod cidr;
pub mod domain;
pub mod grammar;
pub mod ip;
mod matcher;
pub mod scope;
pub mod types;
pub mod url;

pub use self::cidr::{in_range, CdnFilter};
pub use self::domain::{parse_domain_update, DomainAdmission, DomainNormalizer};
pub use self::ip::{parse_ip_update, IpNormalizer};
pub use self::matcher::{matches_scope, ScopeMatcher};
pub use self::scope::{filter_scope, Rejection, ScopeDirection, ScopeSnapshot};
pub use self::types::{Asset, AssetKind, DomainRecord, IpRecord, UrlRecord};
pub use self::url::{UrlBatch, UrlNormalizer};
