use crate::config::Config;
use crate::error::StoreError;
use crate::store::{Store, StoreResult};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Program lifecycle: creation, selection of the default program, and the
/// enabled flag.
#[derive(Clone)]
pub struct ProgramManager {
    store: Arc<dyn Store>,
}

impl ProgramManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, show_disabled: bool) -> StoreResult<Vec<String>> {
        self.store.list_programs(show_disabled).await
    }

    pub async fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.list(true).await?.iter().any(|p| p == name))
    }

    pub async fn create(&self, name: &str) -> StoreResult<()> {
        self.store.create_program(name).await?;
        info!("Created program {}", name);
        Ok(())
    }

    pub async fn disable(&self, name: &str) -> StoreResult<()> {
        self.store.set_program_disabled(name, true).await
    }

    pub async fn enable(&self, name: &str) -> StoreResult<()> {
        self.store.set_program_disabled(name, false).await
    }

    /// Persists `name` as the default program in the config file.
    pub async fn select(&self, name: &str, config: &mut Config, path: &Path) -> Result<()> {
        if !self.exists(name).await? {
            return Err(StoreError::ProgramNotFound(name.to_string()).into());
        }
        remember_program(name, config, path).await
    }

    /// Creates the program and makes it the default one.
    pub async fn create_and_select(
        &self,
        name: &str,
        config: &mut Config,
        path: &Path,
    ) -> Result<()> {
        self.create(name).await?;
        remember_program(name, config, path).await
    }
}

async fn remember_program(name: &str, config: &mut Config, path: &Path) -> Result<()> {
    config.program = Some(name.to_string());
    config.save(path).await?;
    info!("Default program set to {}", name);
    Ok(())
}
