// src/discovery/scheduler.rs
//
// Bounded fan-out over a work list. A shared cursor hands each index to
// exactly one worker; results land positionally so nothing depends on
// completion order, then skip markers are filtered out.
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, concurrency: usize, worker: F) -> Vec<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<R>> + Send,
{
    if items.is_empty() || concurrency == 0 {
        return Vec::new();
    }

    let total = items.len();
    let items = Arc::new(items);
    let cursor = Arc::new(AtomicUsize::new(0));
    let slots: Arc<Mutex<Vec<Option<R>>>> = {
        let mut v = Vec::with_capacity(total);
        v.resize_with(total, || None);
        Arc::new(Mutex::new(v))
    };
    let worker = Arc::new(worker);

    let pool_size = concurrency.min(total);
    let mut handles = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let items = Arc::clone(&items);
        let cursor = Arc::clone(&cursor);
        let slots = Arc::clone(&slots);
        let worker = Arc::clone(&worker);
        handles.push(tokio::spawn(async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= items.len() {
                    break;
                }
                let output = worker(index, items[index].clone()).await;
                slots.lock().await[index] = output;
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Scheduler worker task failed: {}", e);
        }
    }

    let mut slots = slots.lock().await;
    slots.drain(..).flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_item_claimed_exactly_once() {
        let claimed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let claimed_ref = Arc::clone(&claimed);

        let results = run_bounded(
            (0..10u32).collect::<Vec<_>>(),
            3,
            move |index, item| {
                let claimed = Arc::clone(&claimed_ref);
                async move {
                    claimed.lock().unwrap().push(index);
                    Some(item * 2)
                }
            },
        )
        .await;

        let claimed = claimed.lock().unwrap();
        let distinct: HashSet<_> = claimed.iter().copied().collect();
        assert_eq!(claimed.len(), 10);
        assert_eq!(distinct.len(), 10);
        assert_eq!(results.len(), 10);
        let sum: u32 = results.iter().sum();
        assert_eq!(sum, (0..10u32).map(|i| i * 2).sum::<u32>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_more_than_concurrency_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight_ref = Arc::clone(&in_flight);
        let peak_ref = Arc::clone(&peak);

        run_bounded((0..10u32).collect::<Vec<_>>(), 3, move |_, item| {
            let in_flight = Arc::clone(&in_flight_ref);
            let peak = Arc::clone(&peak_ref);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn skip_markers_are_filtered_out() {
        let results = run_bounded((0..6u32).collect::<Vec<_>>(), 2, |_, item| async move {
            if item % 2 == 0 {
                Some(item)
            } else {
                None
            }
        })
        .await;

        assert_eq!(results, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn empty_input_returns_empty() {
        let results: Vec<u32> = run_bounded(Vec::<u32>::new(), 3, |_, item| async move {
            Some(item)
        })
        .await;
        assert!(results.is_empty());
    }
}
