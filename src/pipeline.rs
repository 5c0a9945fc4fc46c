//! Batch ingestion of domains, IPs and URLs.
//!
//! Every batch follows the same shape: read the program's scope and
//! blacklist once, normalize each token against that snapshot, apply any
//! scope expansions in one write, then hand the admitted records to the
//! store in bulk. Keys the store already holds are retried as updates.

use crate::editor::ScopeEditor;
use crate::engine::types::merge_unique;
use crate::engine::{
    parse_domain_update, parse_ip_update, Asset, AssetKind, DomainNormalizer, DomainRecord,
    IpNormalizer, IpRecord, ScopeSnapshot, UrlBatch, UrlNormalizer,
};
use crate::stats::IngestStats;
use crate::store::{AssetPatch, Store, StoreResult};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// What a batch did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Keys created by this batch.
    pub added: Vec<String>,
    /// Keys that already existed and were merged with the new data.
    pub updated: Vec<String>,
    /// Keys that already existed and had nothing to merge.
    pub duplicates: Vec<String>,
    pub stats: IngestStats,
}

#[derive(Clone)]
pub struct AssetIngestPipeline {
    store: Arc<dyn Store>,
    editor: ScopeEditor,
    blacklist_embedded_domains: bool,
}

impl AssetIngestPipeline {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            editor: ScopeEditor::new(store.clone()),
            store,
            blacklist_embedded_domains: false,
        }
    }

    /// See [`IpNormalizer::with_embedded_domain_blacklist`].
    pub fn with_embedded_domain_blacklist(mut self, enabled: bool) -> Self {
        self.blacklist_embedded_domains = enabled;
        self
    }

    async fn snapshot(&self, program: &str) -> StoreResult<ScopeSnapshot> {
        let (inscope, outscope) = self.store.get_program_scope(program).await?;
        let blacklist = self.store.get_program_blacklist(program).await?;
        Ok(ScopeSnapshot::new(inscope, outscope, blacklist))
    }

    pub async fn add_domains(
        &self,
        tokens: &[String],
        program: &str,
        source: Option<&str>,
    ) -> StoreResult<IngestOutcome> {
        let scope = self.snapshot(program).await?;
        let normalizer = DomainNormalizer::new(&scope);
        let mut stats = IngestStats::new();
        let mut admitted = Admitted::<DomainRecord>::default();
        let mut expansions: Vec<String> = Vec::new();

        for token in non_blank(tokens) {
            stats.inc_submitted();
            let admission = normalizer.normalize(token);
            if let Some(wildcard) = admission.scope_expansion {
                merge_unique(&mut expansions, Some(wildcard));
            }
            match admission.result {
                Ok(record) => {
                    stats.inc_admitted();
                    admitted.insert(record.hostname.clone(), record, |existing, new| {
                        merge_unique(&mut existing.ips, new.ips)
                    });
                }
                Err(rejection) => stats.record_rejection(token, rejection),
            }
        }

        // One scope write for the whole batch
        if !expansions.is_empty() {
            info!("Extending inscope of {} with {:?}", program, expansions);
            let added = self.editor.add_inscope(program, &expansions).await?;
            stats.scope_expansions = added.len() as u64;
        }

        let records = admitted.into_values();
        let links: FxHashMap<String, Vec<String>> = records
            .iter()
            .filter(|r| !r.ips.is_empty())
            .map(|r| (r.hostname.clone(), r.ips.clone()))
            .collect();
        let assets = records.into_iter().map(Asset::Domain).collect();

        let outcome = self
            .create_then_merge(
                AssetKind::Domain,
                assets,
                program,
                source,
                |key| links.get(key).cloned().map(AssetPatch::MergeLinks),
                stats,
            )
            .await?;
        outcome.stats.log_summary(AssetKind::Domain, program);
        Ok(outcome)
    }

    pub async fn add_ips(
        &self,
        tokens: &[String],
        program: &str,
        source: Option<&str>,
    ) -> StoreResult<IngestOutcome> {
        let scope = self.snapshot(program).await?;
        let normalizer =
            IpNormalizer::new(&scope).with_embedded_domain_blacklist(self.blacklist_embedded_domains);
        let mut stats = IngestStats::new();
        let mut admitted = Admitted::<IpRecord>::default();

        for token in non_blank(tokens) {
            stats.inc_submitted();
            match normalizer.normalize(token) {
                Ok(record) => {
                    stats.inc_admitted();
                    admitted.insert(record.address.clone(), record, |existing, new| {
                        merge_unique(&mut existing.domains, new.domains)
                    });
                }
                Err(rejection) => stats.record_rejection(token, rejection),
            }
        }

        let records = admitted.into_values();
        let links: FxHashMap<String, Vec<String>> = records
            .iter()
            .filter(|r| !r.domains.is_empty())
            .map(|r| (r.address.clone(), r.domains.clone()))
            .collect();
        let assets = records.into_iter().map(Asset::Ip).collect();

        let outcome = self
            .create_then_merge(
                AssetKind::Ip,
                assets,
                program,
                source,
                |key| links.get(key).cloned().map(AssetPatch::MergeLinks),
                stats,
            )
            .await?;
        outcome.stats.log_summary(AssetKind::Ip, program);
        Ok(outcome)
    }

    /// `hostname` forces the host of every URL, which is what makes path
    /// relative input usable.
    pub async fn add_urls(
        &self,
        tokens: &[String],
        program: &str,
        source: Option<&str>,
        hostname: Option<&str>,
    ) -> StoreResult<IngestOutcome> {
        let scope = self.snapshot(program).await?;
        let normalizer = UrlNormalizer::new(&scope, hostname);
        let mut stats = IngestStats::new();
        let mut batch = UrlBatch::new();

        for token in non_blank(tokens) {
            stats.inc_submitted();
            match normalizer.normalize(token) {
                Ok(record) => {
                    stats.inc_admitted();
                    batch.push(record);
                }
                Err(rejection) => stats.record_rejection(token, rejection),
            }
        }

        let records = batch.into_records();
        let by_url: FxHashMap<String, _> = records
            .iter()
            .map(|r| (r.url.clone(), r.clone()))
            .collect();
        let assets = records.into_iter().map(Asset::Url).collect();

        let outcome = self
            .create_then_merge(
                AssetKind::Url,
                assets,
                program,
                source,
                |key| by_url.get(key).cloned().map(AssetPatch::MergeUrl),
                stats,
            )
            .await?;
        outcome.stats.log_summary(AssetKind::Url, program);
        Ok(outcome)
    }

    /// Bulk create, then retry the keys that already existed as updates.
    /// `merge_patch` returns `None` for keys with nothing to merge, those
    /// are reported as duplicates.
    async fn create_then_merge<F>(
        &self,
        kind: AssetKind,
        assets: Vec<Asset>,
        program: &str,
        source: Option<&str>,
        merge_patch: F,
        stats: IngestStats,
    ) -> StoreResult<IngestOutcome>
    where
        F: Fn(&str) -> Option<AssetPatch>,
    {
        let mut outcome = IngestOutcome {
            stats,
            ..IngestOutcome::default()
        };
        if assets.is_empty() {
            return Ok(outcome);
        }

        let created = self.store.bulk_create(assets, program, source).await?;
        outcome.added = created.created;

        let mut patches = Vec::new();
        for key in created.failed {
            match merge_patch(&key) {
                Some(patch) => patches.push((key, patch)),
                None => outcome.duplicates.push(key),
            }
        }

        if !patches.is_empty() {
            debug!("Retrying {} existing {} keys as updates", patches.len(), kind);
            outcome.updated = self.store.bulk_update(kind, patches).await?;
        }
        Ok(outcome)
    }

    /// Replaces the IP set of existing domains. No scope admission is done,
    /// the domains were admitted when first added.
    pub async fn update_domains(
        &self,
        tokens: &[String],
        program: &str,
    ) -> StoreResult<Vec<String>> {
        let mut patches = Admitted::<AssetPatch>::default();
        for token in non_blank(tokens) {
            match parse_domain_update(token) {
                Some(record) => {
                    patches.insert(record.hostname, AssetPatch::SetLinks(record.ips), replace)
                }
                None => debug!("Skipping malformed domain update '{}'", token),
            }
        }
        let updated = self
            .store
            .bulk_update(AssetKind::Domain, patches.into_entries())
            .await?;
        info!("Updated {} domains of {}", updated.len(), program);
        Ok(updated)
    }

    /// Replaces the domain set of existing IPs.
    pub async fn update_ips(&self, tokens: &[String], program: &str) -> StoreResult<Vec<String>> {
        let mut patches = Admitted::<AssetPatch>::default();
        for token in non_blank(tokens) {
            match parse_ip_update(token) {
                Some(record) => {
                    patches.insert(record.address, AssetPatch::SetLinks(record.domains), replace)
                }
                None => debug!("Skipping malformed IP update '{}'", token),
            }
        }
        let updated = self
            .store
            .bulk_update(AssetKind::Ip, patches.into_entries())
            .await?;
        info!("Updated {} IPs of {}", updated.len(), program);
        Ok(updated)
    }

    pub async fn remove_domains(
        &self,
        tokens: &[String],
        program: &str,
    ) -> StoreResult<Vec<String>> {
        let keys = non_blank(tokens).map(|t| t.to_lowercase()).collect();
        self.remove(AssetKind::Domain, keys, program).await
    }

    pub async fn remove_ips(&self, tokens: &[String], program: &str) -> StoreResult<Vec<String>> {
        let keys = non_blank(tokens).map(str::to_string).collect();
        self.remove(AssetKind::Ip, keys, program).await
    }

    /// Only the first field of each line is the URL, so listing output such
    /// as `<url> <status> <length>` can be piped straight back in.
    pub async fn remove_urls(&self, tokens: &[String], program: &str) -> StoreResult<Vec<String>> {
        let keys = non_blank(tokens)
            .filter_map(|t| t.split_whitespace().next())
            .map(str::to_string)
            .collect();
        self.remove(AssetKind::Url, keys, program).await
    }

    async fn remove(
        &self,
        kind: AssetKind,
        keys: Vec<String>,
        program: &str,
    ) -> StoreResult<Vec<String>> {
        let mut seen = Vec::new();
        merge_unique(&mut seen, keys);
        let patches = seen.into_iter().map(|k| (k, AssetPatch::Delete)).collect();
        let removed = self.store.bulk_update(kind, patches).await?;
        info!("Removed {} {} records from {}", removed.len(), kind, program);
        Ok(removed)
    }
}

fn non_blank(tokens: &[String]) -> impl Iterator<Item = &str> {
    tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
}

fn replace<T>(existing: &mut T, new: T) {
    *existing = new;
}

/// Insertion-ordered map of records keyed by identifier.
struct Admitted<T> {
    entries: Vec<(String, T)>,
    index: FxHashMap<String, usize>,
}

impl<T> Default for Admitted<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T> Admitted<T> {
    fn insert(&mut self, key: String, value: T, merge: impl FnOnce(&mut T, T)) {
        match self.index.get(&key) {
            Some(&idx) => merge(&mut self.entries[idx].1, value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }

    fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admitted_merges_in_order() {
        let mut admitted = Admitted::<Vec<u8>>::default();
        admitted.insert("b".to_string(), vec![1], |e, n| e.extend(n));
        admitted.insert("a".to_string(), vec![2], |e, n| e.extend(n));
        admitted.insert("b".to_string(), vec![3], |e, n| e.extend(n));

        assert_eq!(
            admitted.into_entries(),
            vec![("b".to_string(), vec![1, 3]), ("a".to_string(), vec![2])]
        );
    }

    #[test]
    fn test_non_blank() {
        let tokens = vec![" a ".to_string(), "".to_string(), "   ".to_string(), "b".to_string()];
        assert_eq!(non_blank(&tokens).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
