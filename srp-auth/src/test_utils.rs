// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.
use crate::authorizer::Authorizer;
use crate::config::Config;
use crate::division::{DivisionContext, DivisionId};
use crate::store::MemoryStore;

/// Install a `tracing` subscriber when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// A reimbursement request as handed over by the request workflow.
///
/// Requests which were not filed under a division yet carry no division reference.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub division: Option<DivisionId>,
}

impl PendingRequest {
    pub fn filed_under(division: DivisionId) -> Self {
        Self {
            division: Some(division),
        }
    }

    pub fn unfiled() -> Self {
        Self { division: None }
    }
}

impl DivisionContext for PendingRequest {
    fn division_id(&self) -> Option<DivisionId> {
        self.division
    }
}

/// Authorizer backed by a fresh in-memory store.
pub fn memory_authorizer(config: Config) -> Authorizer<MemoryStore> {
    Authorizer::new(MemoryStore::new(), config)
}
