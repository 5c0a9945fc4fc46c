use crate::engine::types::merge_unique;
use crate::engine::{Asset, AssetKind, UrlRecord};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted shape of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub disabled: bool,
    pub inscope: Vec<String>,
    pub outscope: Vec<String>,
    pub blacklist: Vec<String>,
}

impl Program {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            disabled: false,
            inscope: Vec::new(),
            outscope: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

/// Change applied to an existing record by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPatch {
    Delete,
    /// Replace the associated IP (domain records) or domain (IP records) set.
    SetLinks(Vec<String>),
    /// Union into the associated set.
    MergeLinks(Vec<String>),
    /// Union the query set; overwrite status and content length when given.
    MergeUrl(UrlRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub created: Vec<String>,
    /// Keys that already existed and were left untouched.
    pub failed: Vec<String>,
}

/// The document store holding programs and their assets.
///
/// Asset keys are global: one record per domain, IP or URL string. A bulk
/// create never overwrites; existing keys are reported back as failed.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn create_program(&self, name: &str) -> StoreResult<()>;

    async fn list_programs(&self, include_disabled: bool) -> StoreResult<Vec<String>>;

    async fn set_program_disabled(&self, name: &str, disabled: bool) -> StoreResult<()>;

    /// Every program, used for cross-program scope listings.
    async fn all_programs(&self) -> StoreResult<Vec<Program>>;

    async fn get_program_scope(&self, program: &str) -> StoreResult<(Vec<String>, Vec<String>)>;

    async fn get_program_blacklist(&self, program: &str) -> StoreResult<Vec<String>>;

    async fn update_program_scope(
        &self,
        program: &str,
        inscope: &[String],
        outscope: &[String],
    ) -> StoreResult<()>;

    async fn update_program_blacklist(&self, program: &str, blacklist: &[String])
        -> StoreResult<()>;

    async fn bulk_create(
        &self,
        records: Vec<Asset>,
        program: &str,
        source: Option<&str>,
    ) -> StoreResult<BulkOutcome>;

    /// Applies patches to existing records. Returns the keys that existed and
    /// were changed; unknown keys are skipped.
    async fn bulk_update(
        &self,
        kind: AssetKind,
        patches: Vec<(String, AssetPatch)>,
    ) -> StoreResult<Vec<String>>;

    /// Keys of one asset kind, for one program or all of them.
    async fn list_assets(&self, kind: AssetKind, program: Option<&str>)
        -> StoreResult<Vec<String>>;

    async fn list_urls_by_hostname(&self, hostname: &str) -> StoreResult<Vec<String>>;
}

/// Applies a non-delete patch to a stored record. Returns `false` when the
/// patch does not fit the record kind.
pub(crate) fn apply_patch(asset: &mut Asset, patch: AssetPatch) -> bool {
    match (asset, patch) {
        (Asset::Domain(d), AssetPatch::SetLinks(ips)) => d.ips = ips,
        (Asset::Ip(ip), AssetPatch::SetLinks(domains)) => ip.domains = domains,
        (Asset::Domain(d), AssetPatch::MergeLinks(ips)) => merge_unique(&mut d.ips, ips),
        (Asset::Ip(ip), AssetPatch::MergeLinks(domains)) => merge_unique(&mut ip.domains, domains),
        (Asset::Url(existing), AssetPatch::MergeUrl(update)) => {
            existing.hostname = update.hostname;
            existing.port = update.port;
            if update.status.is_some() {
                existing.status = update.status;
                existing.content_length = update.content_length;
            }
            merge_unique(&mut existing.query, update.query);
        }
        _ => return false,
    }
    true
}
