//! Single-flight coordination of credential refreshes.
//!
//! The coordinator is either idle or refreshing. The first request to hit a
//! 401 while idle becomes the leader: it receives a [`RefreshLease`] and runs
//! the one refresh call. Requests that hit a 401 while a refresh is in
//! flight park on a one-shot channel and are released, in arrival order,
//! with the leader's outcome.
//!
//! The idle check and the switch to refreshing happen under one lock with no
//! suspension point in between, so two callers can never both lead.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use authpipe_core::error::AuthError;
use authpipe_core::{AccessToken, Result};

use crate::attach::CredentialAttachment;

/// Outcome delivered to every parked request.
type Outcome = Result<AccessToken>;

#[derive(Debug)]
enum Phase {
    Idle,
    Refreshing { waiters: Vec<oneshot::Sender<Outcome>> },
}

/// What an unauthorized request should do next.
#[derive(Debug)]
pub enum Ticket<'a> {
    /// Run the refresh and release the queue through the lease.
    Lead(RefreshLease<'a>),
    /// Wait for the in-flight refresh.
    Wait(oneshot::Receiver<Outcome>),
    /// A newer credential is already attached; replay with it.
    Replay(AccessToken),
}

/// Resolve a [`Ticket::Wait`]. A dropped sender means the leader was
/// cancelled before it finished.
pub async fn join(receiver: oneshot::Receiver<Outcome>) -> Outcome {
    receiver
        .await
        .unwrap_or_else(|_| Err(AuthError::RefreshAbandoned.into()))
}

/// Refresh state shared by every request issued through one client.
#[derive(Debug)]
pub struct RefreshCoordinator {
    phase: Mutex<Phase>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Returns true while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), Phase::Refreshing { .. })
    }

    /// Number of requests parked behind the in-flight refresh.
    pub fn waiting(&self) -> usize {
        match &*self.lock() {
            Phase::Idle => 0,
            Phase::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Decide, atomically, how a request that was rejected with 401 proceeds.
    ///
    /// `sent_with` is the credential the rejected request carried. When idle
    /// and `attachment` already holds a different credential, the request
    /// raced a completed refresh and is replayed without another one.
    pub fn acquire(
        &self,
        sent_with: Option<&AccessToken>,
        attachment: &CredentialAttachment,
    ) -> Ticket<'_> {
        let mut phase = self.lock();
        match &mut *phase {
            Phase::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                debug!(position = waiters.len(), "queued behind in-flight refresh");
                Ticket::Wait(rx)
            }
            Phase::Idle => {
                if let Some(current) = attachment.current()
                    && sent_with != Some(&current)
                {
                    debug!("credential changed since request was sent, replaying");
                    return Ticket::Replay(current);
                }

                *phase = Phase::Refreshing {
                    waiters: Vec::new(),
                };
                debug!("starting credential refresh");
                Ticket::Lead(RefreshLease {
                    coordinator: self,
                    released: false,
                })
            }
        }
    }

    /// Return to idle and hand back the queue, in arrival order.
    fn finish(&self) -> Vec<oneshot::Sender<Outcome>> {
        let mut phase = self.lock();
        match std::mem::replace(&mut *phase, Phase::Idle) {
            Phase::Idle => Vec::new(),
            Phase::Refreshing { waiters } => waiters,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder is the single in-flight refresh.
///
/// Dropping the lease without calling [`RefreshLease::release`] (for
/// example when the leading request is cancelled) still returns the
/// coordinator to idle; parked requests then fail with
/// [`AuthError::RefreshAbandoned`].
#[derive(Debug)]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    released: bool,
}

impl RefreshLease<'_> {
    /// Deliver `outcome` to every parked request and return to idle.
    ///
    /// The switch to idle and the hand-off of the queue happen together, so
    /// a 401 observed after this point starts a new cycle instead of joining
    /// a queue nobody will drain.
    pub fn release(mut self, outcome: &Outcome) {
        let waiters = self.coordinator.finish();
        self.released = true;
        debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "releasing refresh queue"
        );
        for waiter in waiters {
            // A closed receiver means that caller went away; nothing to do.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let waiters = self.coordinator.finish();
        warn!(waiters = waiters.len(), "refresh abandoned before completion");
    }
}
