use crate::error::StoreError;
use crate::store::Store;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("You need to select a program to execute this action (use -p <program> or `use <program>`)")]
    NoProgramSelected,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The program an invocation works on, resolved once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramContext {
    program: String,
}

impl ProgramContext {
    /// Prefers the explicit `-p` value over the persisted default.
    pub fn select(explicit: Option<&str>, default: Option<&str>) -> Result<Self, ContextError> {
        explicit
            .or(default)
            .filter(|p| !p.is_empty())
            .map(|p| Self {
                program: p.to_string(),
            })
            .ok_or(ContextError::NoProgramSelected)
    }

    /// [`select`](Self::select), then checks that the store knows the program
    /// so unknown names fail before any batch work starts.
    pub async fn resolve(
        explicit: Option<&str>,
        default: Option<&str>,
        store: &dyn Store,
    ) -> Result<Self, ContextError> {
        let context = Self::select(explicit, default)?;
        let known = store.list_programs(true).await?;
        if !known.iter().any(|p| p == &context.program) {
            return Err(StoreError::ProgramNotFound(context.program).into());
        }
        Ok(context)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}
