//! Counting gate bounding concurrent expensive queries
//!
//! Waiters are admitted in arrival order (tokio's semaphore is fair). A slot is
//! an owned [`AdmissionSlot`]; releasing consumes it, so one acquisition can
//! never be released twice.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ConfigError;

/// Default number of expensive queries admitted at once
pub const DEFAULT_GATE_CAPACITY: usize = 2;

/// Returned by [`AdmissionGate::acquire`] once the gate has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("admission gate is closed")]
pub struct GateClosed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    pub capacity: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    waiters: AtomicUsize,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiters: AtomicUsize::new(0),
        })
    }

    /// Waits until a slot is free and takes it
    ///
    /// Dropping the returned future before it completes leaves the gate
    /// untouched, so callers can layer `tokio::time::timeout` around it.
    pub async fn acquire(&self) -> Result<AdmissionSlot, GateClosed> {
        let _waiting = WaiterGuard::new(&self.waiters);

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Admission slot acquired ({}/{})", in_flight, self.capacity);

        Ok(AdmissionSlot {
            permit: Some(permit),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Wakes every waiter with [`GateClosed`]; slots already held stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            capacity: self.capacity,
            in_flight: self.in_flight(),
            waiters: self.waiters.load(Ordering::SeqCst),
        }
    }
}

/// One admitted slot of an [`AdmissionGate`]
///
/// Released by [`AdmissionSlot::release`] or, failing that, when dropped.
#[derive(Debug)]
pub struct AdmissionSlot {
    permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<AtomicUsize>,
}

impl AdmissionSlot {
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };

        // The counter must drop before the permit does, otherwise the next
        // waiter can observe capacity + 1 slots in flight.
        let decremented = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match decremented {
            Ok(previous) => tracing::debug!("Admission slot released ({} left in flight)", previous - 1),
            Err(_) => tracing::error!("Admission slot released while gate reported no slots in flight"),
        }

        drop(permit);
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.release_inner();
    }
}

struct WaiterGuard<'a> {
    waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    fn new(waiters: &'a AtomicUsize) -> Self {
        waiters.fetch_add(1, Ordering::SeqCst);
        Self { waiters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }
}
