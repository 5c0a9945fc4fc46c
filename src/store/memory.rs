//! In-process implementation of the store.
//!
//! Used by the test suite and by `backend = "memory"`, where nothing outlives
//! the invocation.

use super::types::{apply_patch, AssetPatch, BulkOutcome, Program, Store, StoreResult};
use crate::engine::{Asset, AssetKind};
use crate::error::StoreError;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredAsset {
    asset: Asset,
    source: Option<String>,
    program: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    programs: Vec<Program>,
    assets: FxHashMap<AssetKind, BTreeMap<String, StoredAsset>>,
}

impl MemoryState {
    fn program_mut(&mut self, name: &str) -> StoreResult<&mut Program> {
        self.programs
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| StoreError::ProgramNotFound(name.to_string()))
    }

    fn program(&self, name: &str) -> StoreResult<&Program> {
        self.programs
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| StoreError::ProgramNotFound(name.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Full record lookup; the trait only exposes keys.
    pub fn get_asset(&self, kind: AssetKind, key: &str) -> Option<Asset> {
        let state = self.read().ok()?;
        state
            .assets
            .get(&kind)
            .and_then(|records| records.get(key))
            .map(|stored| stored.asset.clone())
    }

    pub fn get_source(&self, kind: AssetKind, key: &str) -> Option<String> {
        let state = self.read().ok()?;
        state
            .assets
            .get(&kind)
            .and_then(|records| records.get(key))
            .and_then(|stored| stored.source.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_program(&self, name: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.programs.iter().any(|p| p.name == name) {
            return Err(StoreError::ProgramExists(name.to_string()));
        }
        state.programs.push(Program::new(name));
        Ok(())
    }

    async fn list_programs(&self, include_disabled: bool) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .programs
            .iter()
            .filter(|p| include_disabled || !p.disabled)
            .map(|p| p.name.clone())
            .collect())
    }

    async fn set_program_disabled(&self, name: &str, disabled: bool) -> StoreResult<()> {
        let mut state = self.write()?;
        state.program_mut(name)?.disabled = disabled;
        Ok(())
    }

    async fn all_programs(&self) -> StoreResult<Vec<Program>> {
        Ok(self.read()?.programs.clone())
    }

    async fn get_program_scope(&self, program: &str) -> StoreResult<(Vec<String>, Vec<String>)> {
        let state = self.read()?;
        let program = state.program(program)?;
        Ok((program.inscope.clone(), program.outscope.clone()))
    }

    async fn get_program_blacklist(&self, program: &str) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state.program(program)?.blacklist.clone())
    }

    async fn update_program_scope(
        &self,
        program: &str,
        inscope: &[String],
        outscope: &[String],
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let program = state.program_mut(program)?;
        program.inscope = inscope.to_vec();
        program.outscope = outscope.to_vec();
        Ok(())
    }

    async fn update_program_blacklist(
        &self,
        program: &str,
        blacklist: &[String],
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        state.program_mut(program)?.blacklist = blacklist.to_vec();
        Ok(())
    }

    async fn bulk_create(
        &self,
        records: Vec<Asset>,
        program: &str,
        source: Option<&str>,
    ) -> StoreResult<BulkOutcome> {
        let mut state = self.write()?;
        state.program(program)?;

        let mut outcome = BulkOutcome::default();
        for asset in records {
            let key = asset.key().to_string();
            let table = state.assets.entry(asset.kind()).or_default();
            if table.contains_key(&key) {
                outcome.failed.push(key);
                continue;
            }
            table.insert(
                key.clone(),
                StoredAsset {
                    asset,
                    source: source.map(str::to_string),
                    program: program.to_string(),
                },
            );
            outcome.created.push(key);
        }
        Ok(outcome)
    }

    async fn bulk_update(
        &self,
        kind: AssetKind,
        patches: Vec<(String, AssetPatch)>,
    ) -> StoreResult<Vec<String>> {
        let mut state = self.write()?;
        let table = state.assets.entry(kind).or_default();

        let mut updated = Vec::new();
        for (key, patch) in patches {
            let changed = match patch {
                AssetPatch::Delete => table.remove(&key).is_some(),
                patch => match table.get_mut(&key) {
                    Some(stored) => apply_patch(&mut stored.asset, patch),
                    None => false,
                },
            };
            if changed {
                updated.push(key);
            }
        }
        Ok(updated)
    }

    async fn list_assets(
        &self,
        kind: AssetKind,
        program: Option<&str>,
    ) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .assets
            .get(&kind)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, stored)| program.map_or(true, |p| stored.program == p))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_urls_by_hostname(&self, hostname: &str) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .assets
            .get(&AssetKind::Url)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, stored)| {
                        matches!(&stored.asset, Asset::Url(u) if u.hostname == hostname)
                    })
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
