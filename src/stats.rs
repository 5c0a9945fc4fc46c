use crate::engine::{AssetKind, Rejection};
use serde::Serialize;
use tracing::{debug, info};

/// Counters for one ingest batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub submitted: u64,
    pub admitted: u64,
    pub malformed: u64,
    pub blacklisted: u64,
    pub out_of_scope: u64,
    pub not_in_scope: u64,
    pub ambiguous_host: u64,
    pub scope_expansions: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&mut self) {
        self.submitted += 1;
    }

    pub fn inc_admitted(&mut self) {
        self.admitted += 1;
    }

    pub fn record_rejection(&mut self, token: &str, rejection: Rejection) {
        debug!("Rejected '{}': {:?}", token, rejection);
        match rejection {
            Rejection::Malformed => self.malformed += 1,
            Rejection::Blacklisted => self.blacklisted += 1,
            Rejection::OutOfScope => self.out_of_scope += 1,
            Rejection::NotInScope => self.not_in_scope += 1,
            Rejection::AmbiguousHost => self.ambiguous_host += 1,
        }
    }

    pub fn rejected(&self) -> u64 {
        self.malformed + self.blacklisted + self.out_of_scope + self.not_in_scope + self.ambiguous_host
    }

    pub fn log_summary(&self, kind: AssetKind, program: &str) {
        info!(
            "{} batch for {}: Submitted: {}, Admitted: {}, Rejected: {} (malformed {}, blacklisted {}, outscope {}, not inscope {}, ambiguous host {}), ScopeExpansions: {}",
            kind,
            program,
            self.submitted,
            self.admitted,
            self.rejected(),
            self.malformed,
            self.blacklisted,
            self.out_of_scope,
            self.not_in_scope,
            self.ambiguous_host,
            self.scope_expansions
        );
    }
}
