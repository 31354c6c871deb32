use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Collapses concurrent computations that share a key.
///
/// The first caller for a key starts the computation; callers arriving while
/// it is in flight await the same result. The key is released as soon as the
/// computation finishes, so later callers start afresh.
pub struct SingleFlight<T, E> {
    in_flight: Arc<DashMap<String, Flight<T, E>>>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `make()` unless a computation for `key` is already in flight.
    ///
    /// `make` is only invoked by the caller that becomes leader.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let flight = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(key, "Joining in-flight computation");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let release = Release {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.to_string(),
                };
                let work = make();
                let flight = async move {
                    let _release = release;
                    work.await
                }
                .boxed()
                .shared();
                slot.insert(flight.clone());
                flight
            }
        };
        flight.await
    }

    /// Number of keys with a computation in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Frees the key when the computation completes or unwinds.
struct Release<T, E> {
    in_flight: Arc<DashMap<String, Flight<T, E>>>,
    key: String,
}

impl<T, E> Drop for Release<T, E> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let flights: Arc<SingleFlight<u32, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flights
                    .run("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_key_is_released_after_completion() {
        let flights: SingleFlight<u32, String> = SingleFlight::new();
        let first = flights.run("k", || async { Ok(1) }).await;
        let second = flights.run("k", || async { Ok(2) }).await;
        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(2));
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_released() {
        let flights: SingleFlight<u32, String> = SingleFlight::new();
        let err = flights.run("k", || async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let flights: SingleFlight<&'static str, String> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flights.run("a", || async { Ok("a") }),
            flights.run("b", || async { Ok("b") })
        );
        assert_eq!((a, b), (Ok("a"), Ok("b")));
    }
}
