//! Registry of lazy fields still being resolved per request
//!
//! Each registration carries a one-shot completion hook. The hook runs exactly
//! once: when the last pending field completes, or during `register` itself
//! when nothing was selected. Hooks always run outside the registry lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{LazyField, RequestId};

type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

struct PendingEntry {
    fields: HashSet<LazyField>,
    on_complete: CompletionHook,
}

#[derive(Default)]
pub struct LazyCompletionTracker {
    entries: Mutex<HashMap<RequestId, PendingEntry>>,
}

impl LazyCompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestId, PendingEntry>> {
        // Hooks never run under the lock, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking `fields` for `request_id`
    ///
    /// An existing registration for the same id is replaced and its hook is
    /// dropped without running. With no fields the hook runs before this
    /// returns.
    pub fn register<F>(
        &self,
        request_id: RequestId,
        fields: impl IntoIterator<Item = LazyField>,
        on_complete: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        let fields: HashSet<LazyField> = fields.into_iter().collect();

        if fields.is_empty() {
            let replaced = self.entries().remove(&request_id);
            if replaced.is_some() {
                tracing::warn!("Request {} re-registered; dropping previous pending set", request_id);
            }
            tracing::debug!("Request {} registered without lazy fields", request_id);
            on_complete();
            return;
        }

        tracing::debug!(
            "Request {} waiting on lazy fields: {}",
            request_id,
            describe(&fields)
        );

        let entry = PendingEntry {
            fields,
            on_complete: Box::new(on_complete),
        };
        let replaced = self.entries().insert(request_id, entry);
        if replaced.is_some() {
            tracing::warn!("Request {} re-registered; dropping previous pending set", request_id);
        }
        // `replaced` drops here, after the lock guard above was released
    }

    /// Marks `field` as finished for `request_id`
    ///
    /// Returns true when this call emptied the pending set and ran the hook.
    /// Unknown ids and fields that are not pending are ignored.
    pub fn complete(&self, request_id: RequestId, field: LazyField) -> bool {
        let hook = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(&request_id) else {
                tracing::debug!("Ignoring completion of {} for unknown request {}", field, request_id);
                return false;
            };
            if !entry.fields.remove(&field) {
                tracing::debug!("Ignoring repeated completion of {} for request {}", field, request_id);
                return false;
            }
            if !entry.fields.is_empty() {
                return false;
            }
            entries.remove(&request_id).map(|entry| entry.on_complete)
        };

        match hook {
            Some(on_complete) => {
                tracing::debug!("All lazy fields of request {} finished", request_id);
                on_complete();
                true
            }
            None => false,
        }
    }

    /// Fields still pending for `request_id`, if it is registered
    pub fn pending(&self, request_id: RequestId) -> Option<Vec<LazyField>> {
        self.entries().get(&request_id).map(|entry| {
            let mut fields: Vec<LazyField> = entry.fields.iter().copied().collect();
            fields.sort();
            fields
        })
    }

    /// Number of requests with outstanding lazy fields
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LazyCompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCompletionTracker")
            .field("pending_requests", &self.len())
            .finish()
    }
}

fn describe(fields: &HashSet<LazyField>) -> String {
    let mut names: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
    names.sort_unstable();
    names.join(", ")
}

/// Reports a lazy field as finished when dropped
///
/// Dropping covers success, an error result, a panic unwinding through the
/// resolver and cancellation of the resolving task alike.
pub struct CompletionGuard {
    tracker: Arc<LazyCompletionTracker>,
    request_id: RequestId,
    field: LazyField,
}

impl CompletionGuard {
    pub fn new(tracker: Arc<LazyCompletionTracker>, request_id: RequestId, field: LazyField) -> Self {
        Self {
            tracker,
            request_id,
            field,
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.complete(self.request_id, self.field);
    }
}
