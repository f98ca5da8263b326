//! The concurrency gate (§4.7): a counting semaphore bounding how many
//! documents may be open at once. FIFO-fair by construction — `tokio`'s
//! semaphore wakes waiters in acquire order — and the only piece of shared
//! mutable state the service has.

use std::sync::Arc;

use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyGate {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Suspends until a slot is free. The returned permit releases the slot
    /// when dropped, so callers hold it for exactly the lifetime of the
    /// editor it guards.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_waiter_blocks_until_first_permit_drops() {
        let gate = ConcurrencyGate::new(1);
        let first = gate.acquire().await.unwrap();

        let gate2 = gate.clone();
        let waiter = tokio::spawn(async move {
            let _permit = gate2.acquire().await.unwrap();
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn permits_up_to_the_configured_width_proceed_concurrently() {
        let gate = ConcurrencyGate::new(2);
        let a = gate.acquire().await.unwrap();
        let b = gate.acquire().await.unwrap();
        assert_eq!(gate.semaphore.available_permits(), 0);
        drop(a);
        drop(b);
    }
}
