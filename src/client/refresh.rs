use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::StatusCode;

use thiserror::Error;

use tokio::sync::oneshot;

/// Why a session refresh did not produce a new access token
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshError {
    #[error("Session refresh rejected with status {status}")]
    Rejected { status: StatusCode },

    #[error("Session refresh failed: {0}")]
    Failed(String),

    #[error("Session refresh was abandoned before it completed")]
    Cancelled,
}

pub type RefreshResult = Result<(), RefreshError>;

type Waiter = oneshot::Sender<RefreshResult>;

#[derive(Debug)]
enum State {
    Idle,
    /// A refresh is running; the waiters are released with its outcome
    InFlight(Vec<Waiter>),
}

/// Single-flight gate around session refresh.
///
/// The first caller runs the refresh, callers arriving while it is in flight wait for and
/// share its outcome. At most one refresh runs at a time.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<State>>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `refresh` unless one is already in flight, in which case wait for that one
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshResult>,
    {
        let waiting = {
            let mut state = self.lock();
            match &mut *state {
                State::InFlight(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                State::Idle => {
                    *state = State::InFlight(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiting {
            tracing::debug!("Waiting on in-flight session refresh");
            // The sender only disappears if the leader vanished without settling
            return rx.await.unwrap_or(Err(RefreshError::Cancelled));
        }

        let mut leader = Leader {
            coordinator: self,
            settled: false,
        };
        let result = refresh().await;
        leader.settle(result.clone());
        result
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), State::InFlight(_))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, result: RefreshResult) {
        let previous = std::mem::replace(&mut *self.lock(), State::Idle);
        if let State::InFlight(waiters) = previous {
            tracing::debug!(waiters = waiters.len(), "Releasing session refresh waiters");
            for waiter in waiters {
                // A waiter that gave up has dropped its receiver
                let _ = waiter.send(result.clone());
            }
        }
    }
}

/// Held by the caller running the refresh; rejects the waiters if it is dropped early
struct Leader<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Leader<'_> {
    fn settle(&mut self, result: RefreshResult) {
        self.settled = true;
        self.coordinator.release(result);
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.release(Err(RefreshError::Cancelled));
        }
    }
}
