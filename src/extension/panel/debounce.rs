use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Trailing-edge debouncer over a broadcast feed.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Wait for the next burst of events and return its last event once the
    /// feed has been quiet for a full window. `None` when the feed closed
    /// without a pending event.
    pub async fn next_burst<T: Clone>(&self, events: &mut broadcast::Receiver<T>) -> Option<T> {
        let mut last = loop {
            match events.recv().await {
                Ok(event) => break event,
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        };

        loop {
            match tokio::time::timeout(self.window, events.recv()).await {
                Err(_) | Ok(Err(RecvError::Closed)) => return Some(last),
                Ok(Ok(event)) => last = event,
                Ok(Err(RecvError::Lagged(_))) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_event() {
        let (tx, mut rx) = broadcast::channel(16);
        let debouncer = Debouncer::new(Duration::from_millis(500));

        let producer = tokio::spawn(async move {
            for i in 0..5 {
                tx.send(i).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(tx);
        });

        let start = Instant::now();
        assert_eq!(debouncer.next_burst(&mut rx).await, Some(4));
        // last event at 400 ms, then one quiet window
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900));
        assert!(elapsed < Duration::from_millis(1000));

        assert_eq!(debouncer.next_burst(&mut rx).await, None);
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn separated_events_are_separate_bursts() {
        let (tx, mut rx) = broadcast::channel(16);
        let debouncer = Debouncer::new(Duration::from_millis(500));

        tx.send("a").unwrap();
        assert_eq!(debouncer.next_burst(&mut rx).await, Some("a"));
        tx.send("b").unwrap();
        assert_eq!(debouncer.next_burst(&mut rx).await, Some("b"));
    }
}
