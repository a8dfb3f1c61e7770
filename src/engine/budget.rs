//! Admission control for in-flight invocations

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct BudgetStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Fixed-capacity pool of concurrency slots shared by all work units
#[derive(Debug, Clone)]
pub struct ConcurrencyBudget {
    capacity: usize,
    slots: Arc<Semaphore>,
    stats: Arc<BudgetStats>,
}

/// One held slot; dropping it returns the slot to the budget
#[derive(Debug)]
pub struct BudgetSlot {
    _permit: OwnedSemaphorePermit,
    stats: Arc<BudgetStats>,
}

impl Drop for BudgetSlot {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }
}

impl ConcurrencyBudget {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            stats: Arc::new(BudgetStats::default()),
        }
    }

    /// Wait until a slot is free and take it
    ///
    /// Returns `None` only if the underlying semaphore is closed, which the
    /// budget itself never does.
    pub async fn acquire(&self) -> Option<BudgetSlot> {
        let permit = self.slots.clone().acquire_owned().await.ok()?;
        self.stats.acquired.fetch_add(1, Ordering::Relaxed);
        Some(BudgetSlot {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn acquired(&self) -> u64 {
        self.stats.acquired.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.stats.released.load(Ordering::Relaxed)
    }

    /// Slots currently held by running units
    pub fn in_flight(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slots_are_returned_on_drop() {
        let budget = ConcurrencyBudget::new(2);
        let a = budget.acquire().await.unwrap();
        let b = budget.acquire().await.unwrap();
        assert_eq!(budget.available(), 0);
        assert_eq!(budget.in_flight(), 2);

        drop(a);
        assert_eq!(budget.available(), 1);
        drop(b);
        assert_eq!(budget.available(), 2);
        assert_eq!(budget.acquired(), 2);
        assert_eq!(budget.released(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_budget_blocks() {
        let budget = ConcurrencyBudget::new(1);
        let _held = budget.acquire().await.unwrap();
        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            budget.acquire(),
        )
        .await;
        assert!(waiting.is_err());
    }

    #[tokio::test]
    async fn test_slot_released_when_task_panics() {
        let budget = ConcurrencyBudget::new(1);
        let slot = budget.acquire().await.unwrap();
        let handle = tokio::spawn(async move {
            let _slot = slot;
            panic!("operation blew up");
        });
        assert!(handle.await.is_err());
        assert_eq!(budget.released(), 1);
        assert_eq!(budget.available(), 1);
    }
}
