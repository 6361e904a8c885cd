use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::state::{Bracket, BracketDocument, BracketFilter};

/// Backing store of bracket documents.
///
/// Every write is a whole-document replacement guarded by the version the
/// writer last read; implementations must apply it atomically.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a bracket document, `NotFound` if absent
    async fn get(&self, bracket_id: &str) -> Result<BracketDocument>;

    /// Replace a bracket if its stored version is still `expected_version`.
    ///
    /// Returns the new version, `VersionConflict` when another write got in
    /// first, `NotFound` when the bracket is gone.
    async fn compare_and_set(
        &self,
        bracket_id: &str,
        expected_version: u64,
        bracket: Bracket,
    ) -> Result<u64>;

    /// Store a new bracket at version 1
    async fn insert(&self, bracket: Bracket) -> Result<BracketDocument>;

    /// Delete a bracket and with it all its slots
    async fn remove(&self, bracket_id: &str) -> Result<()>;

    /// All documents whose bracket matches the filter
    async fn list(&self, filter: &BracketFilter) -> Result<Vec<BracketDocument>>;
}

/// Shared document store type
pub type SharedDocumentStore = Arc<dyn DocumentStore>;
