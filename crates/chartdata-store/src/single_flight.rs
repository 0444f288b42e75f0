use crate::{StoreError, StoreErrorCode};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::{watch, Mutex};

type Outcome<T> = Option<Result<T, StoreError>>;

/// Per-key work coalescing: the first caller for a key runs the work, every
/// concurrent caller for the same key attaches to that in-flight operation and
/// receives the same result. The key is removed once the operation settles,
/// success or failure, so a later call starts fresh.
pub(crate) struct SingleFlight<K, T> {
    abort_code: StoreErrorCode,
    inflight: Mutex<HashMap<K, watch::Receiver<Outcome<T>>>>,
}

enum Role<T> {
    Leader(watch::Sender<Outcome<T>>),
    Waiter(watch::Receiver<Outcome<T>>),
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new(abort_code: StoreErrorCode) -> Self {
        Self {
            abort_code,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let role = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(&key) {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.clone(), rx);
                    Role::Leader(tx)
                }
            }
        };
        match role {
            Role::Leader(tx) => {
                let result = work().await;
                self.inflight.lock().await.remove(&key);
                let _ = tx.send(Some(result.clone()));
                result
            }
            Role::Waiter(mut rx) => {
                // Clone the outcome out of the watch guard before matching so
                // the non-Send guard is dropped before any further await.
                let waited = rx
                    .wait_for(Option::is_some)
                    .await
                    .map(|outcome| (*outcome).clone());
                match waited {
                    Ok(outcome) => outcome.unwrap_or_else(|| Err(self.aborted())),
                    Err(_) => {
                        // The leader was dropped mid-flight; clear the dead
                        // slot so the next caller can retry.
                        self.inflight.lock().await.remove(&key);
                        Err(self.aborted())
                    }
                }
            }
        }
    }

    fn aborted(&self) -> StoreError {
        StoreError::new(
            self.abort_code,
            "coalesced operation was dropped before completing",
        )
    }
}
