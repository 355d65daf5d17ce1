use futures::stream::{self, StreamExt};
use std::future::Future;

/// Bounded-concurrency submission queue.
///
/// Starts at most `concurrency` submissions at a time and hands results back
/// in input order, whatever order they complete in. With the default of 1
/// the next submission only starts after the previous one resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadQueue {
    concurrency: usize,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::sequential()
    }
}

impl UploadQueue {
    /// A limit of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Submit every item and call `on_result(index, result)` once per item,
    /// in input order.
    pub async fn run<T, R, S, Fut, H>(&self, items: Vec<T>, submit: S, mut on_result: H)
    where
        S: Fn(usize, T) -> Fut,
        Fut: Future<Output = R>,
        H: FnMut(usize, R),
    {
        let mut results = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let fut = submit(index, item);
                async move { (index, fut.await) }
            })
            .buffered(self.concurrency);

        while let Some((index, result)) = results.next().await {
            on_result(index, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn max_in_flight(concurrency: usize, items: usize) -> (usize, Vec<usize>) {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let mut seen = Vec::new();

        UploadQueue::new(concurrency)
            .run(
                (0..items).collect(),
                |_, item: usize| {
                    let in_flight = &in_flight;
                    let peak = &peak;
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        // Later items finish first when several are in flight.
                        for _ in 0..(items - item) {
                            tokio::task::yield_now().await;
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        item * 10
                    }
                },
                |index, result| {
                    assert_eq!(result, index * 10);
                    seen.push(index);
                },
            )
            .await;

        (peak.load(Ordering::SeqCst), seen)
    }

    #[tokio::test]
    async fn sequential_has_one_in_flight() {
        let (peak, seen) = max_in_flight(1, 5).await;
        assert_eq!(peak, 1);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn wider_queue_keeps_input_order() {
        let (peak, seen) = max_in_flight(3, 6).await;
        assert_eq!(peak, 3);
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_is_clamped() {
        assert_eq!(UploadQueue::new(0).concurrency(), 1);
        assert_eq!(UploadQueue::default(), UploadQueue::sequential());
    }
}
