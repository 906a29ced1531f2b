//! Bounded worker pool draining the inbound message queue.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::ports::InboundMessage;
use crate::router::MessageHandler;

/// Runs a [`MessageHandler`] on inbound messages with at most `workers`
/// messages in flight.
pub struct IngestPool<H> {
    handler: Arc<H>,
    workers: usize,
}

impl<H> IngestPool<H>
where
    H: MessageHandler + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(handler: Arc<H>, workers: usize) -> Self {
        Self {
            handler,
            workers: workers.max(1),
        }
    }

    /// Consume messages until every sender is dropped, then wait for the
    /// in-flight ones to finish.
    pub async fn run(self, mut receiver: mpsc::Receiver<InboundMessage>) {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        tracing::info!(workers = self.workers, "ingest pool started");
        while let Some(message) = receiver.recv().await {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                handler.handle(message).await;
                drop(permit);
            });
        }
        // every permit back means every worker finished
        let total = u32::try_from(self.workers).unwrap_or(u32::MAX);
        if semaphore.acquire_many(total).await.is_ok() {
            tracing::info!("ingest pool drained");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        active: AtomicUsize,
        peak: AtomicUsize,
        topics: Mutex<Vec<String>>,
    }

    impl MessageHandler for CountingHandler {
        fn handle(&self, message: InboundMessage) -> impl Future<Output = ()> + Send {
            async move {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.topics.lock().unwrap().push(message.topic);
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn should_process_every_message_before_returning() {
        let handler = Arc::new(CountingHandler::default());
        let (sender, receiver) = mpsc::channel(16);
        for i in 0..10 {
            sender
                .send(InboundMessage::new(format!("cam/D{i}/status"), "{}"))
                .await
                .unwrap();
        }
        drop(sender);

        IngestPool::new(Arc::clone(&handler), 3).run(receiver).await;

        assert_eq!(handler.topics.lock().unwrap().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_never_exceed_worker_limit() {
        let handler = Arc::new(CountingHandler::default());
        let (sender, receiver) = mpsc::channel(64);
        for i in 0..50 {
            sender
                .send(InboundMessage::new(format!("cam/D{i}/dht"), "{}"))
                .await
                .unwrap();
        }
        drop(sender);

        IngestPool::new(Arc::clone(&handler), 2).run(receiver).await;

        assert!(handler.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(handler.topics.lock().unwrap().len(), 50);
    }
}
