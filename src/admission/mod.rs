//! Admission control for expensive repository queries
//!
//! A details query may fan out into several lazy fields, each of which can walk
//! an entire repository tree. The [`AdmissionGate`] bounds how many such queries
//! run at once; the [`LazyCompletionTracker`] holds the admitted slot until every
//! lazy field the caller selected has finished, then releases it exactly once.
//!
//! ```
//! use gitscan_mcp::admission::{AdmissionGate, LazyCompletionTracker, LazyField, RequestId};
//!
//! # tokio_test::block_on(async {
//! let gate = AdmissionGate::new(2).unwrap();
//! let tracker = LazyCompletionTracker::new();
//!
//! let slot = gate.acquire().await.unwrap();
//! let request_id = RequestId::new();
//! tracker.register(request_id, [LazyField::NumberOfFiles], move || slot.release());
//! assert_eq!(gate.in_flight(), 1);
//!
//! tracker.complete(request_id, LazyField::NumberOfFiles);
//! assert_eq!(gate.in_flight(), 0);
//! # });
//! ```

pub mod gate;
pub mod tracker;

use rmcp::schemars;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

pub use gate::{AdmissionGate, AdmissionSlot, DEFAULT_GATE_CAPACITY, GateClosed, GateSnapshot};
pub use tracker::{CompletionGuard, LazyCompletionTracker};

/// Optional fields of a repository details query
///
/// Each one costs further remote calls, so the gate slot of the query is held
/// until all selected ones have resolved.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    schemars::JsonSchema,
    serde::Serialize,
    serde::Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
pub enum LazyField {
    /// Count of every file in the repository tree
    #[strum(to_string = "numberOfFiles", serialize = "number_of_files")]
    #[serde(alias = "number_of_files")]
    NumberOfFiles,
    /// Content of the first `.yml` file found in the tree
    #[strum(to_string = "ymlFile", serialize = "yml_file")]
    #[serde(alias = "yml_file")]
    YmlFile,
    /// Webhooks of the repository that are currently active
    #[strum(to_string = "activeWebhooks", serialize = "active_webhooks")]
    #[serde(alias = "active_webhooks")]
    ActiveWebhooks,
}

/// Identifies one admitted top-level query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
