use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

struct Flight<T> {
    id: u64,
    shared: Shared<BoxFuture<'static, T>>,
}

type Slot<T> = Arc<Mutex<Option<Flight<T>>>>;

/// Guarded slot holding at most one in-progress operation.
///
/// The first caller starts the operation; callers arriving while it runs
/// subscribe to the same shared future instead of starting another. The slot
/// empties itself when the operation finishes, before any waiter observes the
/// result, so "in flight" and "slot occupied" are the same thing.
pub struct SingleFlight<T: Clone> {
    slot: Slot<T>,
    next_id: AtomicU64,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Join the running operation, or start one with `start`.
    ///
    /// `start` is only invoked when nothing is in flight.
    pub async fn run<F>(&self, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let shared = {
            let mut slot = lock(&self.slot);
            match slot.as_ref() {
                Some(flight) => flight.shared.clone(),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let work = start();
                    let owner = Arc::clone(&self.slot);
                    let shared = async move {
                        let output = work.await;
                        vacate(&owner, id);
                        output
                    }
                    .boxed()
                    .shared();
                    *slot = Some(Flight {
                        id,
                        shared: shared.clone(),
                    });
                    shared
                }
            }
        };
        shared.await
    }

    /// Forget the current handle. Waiters already subscribed still receive
    /// its result; the next `run` starts fresh.
    pub fn clear(&self) {
        lock(&self.slot).take();
    }
}

fn lock<T>(slot: &Mutex<Option<Flight<T>>>) -> MutexGuard<'_, Option<Flight<T>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn vacate<T>(slot: &Mutex<Option<Flight<T>>>, id: u64) {
    let mut guard = lock(slot);
    if guard.as_ref().is_some_and(|flight| flight.id == id) {
        guard.take();
    }
}
