use crate::engine::{filter_scope, AssetKind, CdnFilter, ScopeDirection};
use crate::store::{Store, StoreResult};
use std::sync::Arc;

/// Which programs a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Program(&'a str),
    /// Every enabled program, or every program with `include_disabled`.
    All { include_disabled: bool },
}

/// Read side of the store: asset listings and scope resolution.
#[derive(Clone)]
pub struct Inventory {
    store: Arc<dyn Store>,
}

impl Inventory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn domains(&self, program: Option<&str>) -> StoreResult<Vec<String>> {
        self.store.list_assets(AssetKind::Domain, program).await
    }

    /// With a `cdn_filter`, IPs inside any of its ranges are left out.
    pub async fn ips(
        &self,
        program: Option<&str>,
        cdn_filter: Option<&CdnFilter>,
    ) -> StoreResult<Vec<String>> {
        let ips = self.store.list_assets(AssetKind::Ip, program).await?;
        Ok(match cdn_filter {
            Some(filter) => filter.retain_non_cdn(ips),
            None => ips,
        })
    }

    pub async fn urls(&self, program: Option<&str>) -> StoreResult<Vec<String>> {
        self.store.list_assets(AssetKind::Url, program).await
    }

    pub async fn urls_by_hostname(&self, hostname: &str) -> StoreResult<Vec<String>> {
        self.store.list_urls_by_hostname(hostname).await
    }

    pub async fn resolve_scope(
        &self,
        target: Target<'_>,
        direction: ScopeDirection,
        wildcard_only: bool,
        top_level_only: bool,
    ) -> StoreResult<Vec<String>> {
        let patterns = match target {
            Target::Program(program) => {
                let (inscope, outscope) = self.store.get_program_scope(program).await?;
                match direction {
                    ScopeDirection::In => inscope,
                    ScopeDirection::Out => outscope,
                }
            }
            Target::All { include_disabled } => self
                .store
                .all_programs()
                .await?
                .into_iter()
                .filter(|p| include_disabled || !p.disabled)
                .flat_map(|p| match direction {
                    ScopeDirection::In => p.inscope,
                    ScopeDirection::Out => p.outscope,
                })
                .collect(),
        };
        Ok(filter_scope(patterns, wildcard_only, top_level_only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn seeded() -> Inventory {
        let store = Arc::new(MemoryStore::new());
        store.create_program("acme").await.unwrap();
        store.create_program("globex").await.unwrap();
        store
            .update_program_scope(
                "acme",
                &strings(&["*.acme.com", "*.dev.acme.com", "acme.com"]),
                &strings(&["vpn.acme.com"]),
            )
            .await
            .unwrap();
        store
            .update_program_scope("globex", &strings(&["*.globex.io"]), &[])
            .await
            .unwrap();
        store.set_program_disabled("globex", true).await.unwrap();
        Inventory::new(store)
    }

    #[tokio::test]
    async fn test_resolve_scope_single_program() {
        let inventory = seeded().await;
        assert_eq!(
            inventory
                .resolve_scope(Target::Program("acme"), ScopeDirection::In, false, false)
                .await
                .unwrap(),
            strings(&["*.acme.com", "*.dev.acme.com", "acme.com"])
        );
        assert_eq!(
            inventory
                .resolve_scope(Target::Program("acme"), ScopeDirection::In, true, true)
                .await
                .unwrap(),
            strings(&["acme.com"])
        );
        assert_eq!(
            inventory
                .resolve_scope(Target::Program("acme"), ScopeDirection::Out, false, false)
                .await
                .unwrap(),
            strings(&["vpn.acme.com"])
        );
    }

    #[tokio::test]
    async fn test_resolve_scope_all_programs() {
        let inventory = seeded().await;
        let target = Target::All {
            include_disabled: false,
        };
        assert_eq!(
            inventory
                .resolve_scope(target, ScopeDirection::In, true, false)
                .await
                .unwrap(),
            strings(&["acme.com", "dev.acme.com"])
        );

        let target = Target::All {
            include_disabled: true,
        };
        assert_eq!(
            inventory
                .resolve_scope(target, ScopeDirection::In, true, true)
                .await
                .unwrap(),
            strings(&["acme.com", "globex.io"])
        );
    }
}
