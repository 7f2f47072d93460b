use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};

/// Single-flight gate for settlement runs.
#[derive(Clone)]
pub struct RunGate {
    sem: Arc<Semaphore>,
}

impl RunGate {
    pub fn new() -> Self {
        Self {
            sem: Arc::new(Semaphore::new(1)),
        }
    }

    /// Returns a permit when no run is active. Otherwise waits until the active
    /// run releases its permit and returns `None`; the caller must not start a run.
    pub async fn enter(&self) -> Option<SemaphorePermit<'_>> {
        match self.sem.try_acquire() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) => {
                let _ = self.sem.acquire().await;
                None
            }
            Err(TryAcquireError::Closed) => None,
        }
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.sem.available_permits() == 0
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_caller_waits_for_active_run_then_returns() {
        let gate = RunGate::new();
        let first = gate.enter().await.expect("idle gate admits");
        assert!(gate.is_busy());

        let waiter = async { gate.enter().await.is_none() };
        let releaser = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(first);
        };
        let (joined, ()) = tokio::join!(waiter, releaser);

        assert!(joined);
        assert!(!gate.is_busy());
        assert!(gate.enter().await.is_some());
    }

    #[tokio::test]
    async fn permit_is_released_on_panic() {
        let gate = RunGate::new();
        let g = gate.clone();
        let res = tokio::spawn(async move {
            let _permit = g.enter().await;
            panic!("cycle crashed");
        })
        .await;
        assert!(res.is_err());
        assert!(!gate.is_busy());
    }
}
