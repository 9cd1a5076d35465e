use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pollq_core::domain::{Message, MessageId, QueueDescriptor, QueueSettings};
use pollq_core::error::{HandlerError, StoreError, StoreResult};
use pollq_core::ports::{FixedClock, QueueStore, handler_fn};
use pollq_core::{GiveUpAfter, InMemoryQueueStore, PollqError, ProcessorConfig, QueueProcessor};

const Q: &str = "q1";

fn fixed_store() -> (Arc<FixedClock>, Arc<InMemoryQueueStore<FixedClock>>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(InMemoryQueueStore::with_clock(Arc::clone(&clock)));
    (clock, store)
}

async fn wait_until_empty(store: &InMemoryQueueStore, name: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.message_count(name).await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue was not drained in time");
}

#[tokio::test]
async fn running_processor_commits_successful_batch() {
    let store = Arc::new(InMemoryQueueStore::new());
    store.create_queue(Q, QueueSettings::default()).await.unwrap();
    for i in 0..3 {
        store
            .send_message(Q, format!("job-{i}"), Some(Duration::ZERO))
            .await
            .unwrap()
            .expect("queue exists");
    }

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    let processor = QueueProcessor::new(
        store.clone(),
        ProcessorConfig::new(Q)
            .with_max_messages(3)
            .with_poll_delay(Duration::from_millis(50)),
        handler_fn(move |_m: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<bool, HandlerError>(true)
            }
        }),
    )
    .unwrap();

    assert!(processor.start());
    wait_until_empty(&store, Q).await;
    processor.stop_and_join().await;

    assert_eq!(handled.load(Ordering::SeqCst), 3);
    let queues = store.list_queues().await.unwrap();
    assert!(queues.iter().any(|q| q.name == Q));
    assert!(store.receive_messages(Q, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn declined_message_returns_after_visibility_timeout() {
    let (clock, store) = fixed_store();
    store
        .create_queue(
            Q,
            QueueSettings::default().with_visibility_timeout(Duration::from_secs(90)),
        )
        .await
        .unwrap();
    let keep = store.send_message(Q, "X".into(), None).await.unwrap().unwrap();
    store.send_message(Q, "Y".into(), None).await.unwrap();

    let processor = QueueProcessor::new(
        store.clone(),
        ProcessorConfig::new(Q).with_max_messages(10),
        handler_fn(|m: Message| async move { Ok::<bool, HandlerError>(m.body != "X") }),
    )
    .unwrap();

    let report = processor.poll_once().await.unwrap();
    assert_eq!((report.deleted, report.retained), (1, 1));

    assert!(store.receive_messages(Q, 10).await.unwrap().is_empty());

    clock.advance(Duration::from_secs(90));
    let again = store.receive_messages(Q, 10).await.unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].id, keep);
    assert_eq!(again[0].approximate_receive_count, 2);
}

#[tokio::test]
async fn give_up_policy_retires_poison_message() {
    let (clock, store) = fixed_store();
    store
        .create_queue(
            Q,
            QueueSettings::default().with_visibility_timeout(Duration::from_secs(30)),
        )
        .await
        .unwrap();
    store.send_message(Q, "poison".into(), None).await.unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let processor = QueueProcessor::new(
        store.clone(),
        ProcessorConfig::new(Q),
        GiveUpAfter::new(handler_fn(move |_m: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<bool, HandlerError>(false)
            }
        })),
    )
    .unwrap();

    for _ in 0..6 {
        processor.poll_once().await.unwrap();
        clock.advance(Duration::from_secs(30));
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert_eq!(store.message_count(Q).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn competing_processors_never_double_deliver_inside_window() {
    let store = Arc::new(InMemoryQueueStore::new());
    store.create_queue(Q, QueueSettings::default()).await.unwrap();
    for i in 0..20 {
        store.send_message(Q, format!("m{i}"), None).await.unwrap();
    }

    let handled = Arc::new(AtomicUsize::new(0));
    let make = |handled: Arc<AtomicUsize>| {
        QueueProcessor::new(
            store.clone(),
            ProcessorConfig::new(Q).with_max_messages(4),
            handler_fn(move |_m: Message| {
                let handled = Arc::clone(&handled);
                async move {
                    handled.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    // keep everything in flight so a second delivery would be visible
                    Ok::<bool, HandlerError>(false)
                }
            }),
        )
        .unwrap()
    };
    let first = make(Arc::clone(&handled));
    let second = make(Arc::clone(&handled));

    for _ in 0..5 {
        let (a, b) = tokio::join!(first.poll_once(), second.poll_once());
        a.unwrap();
        b.unwrap();
    }

    assert_eq!(handled.load(Ordering::SeqCst), 20);
    let counts = store.counts(Q).await.unwrap();
    assert_eq!(counts.in_flight, 20);
}

/// Store whose every call fails, counting receive attempts.
#[derive(Default)]
struct UnavailableStore {
    receives: AtomicUsize,
}

#[async_trait]
impl QueueStore for UnavailableStore {
    async fn create_queue(&self, _name: &str, _settings: QueueSettings) -> StoreResult<()> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn delete_queue(&self, _name: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn send_message(
        &self,
        _name: &str,
        _body: String,
        _delay: Option<Duration>,
    ) -> StoreResult<Option<MessageId>> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn delete_message(&self, _name: &str, _id: MessageId) -> StoreResult<()> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn receive_messages(&self, _name: &str, _max_count: usize) -> StoreResult<Vec<Message>> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("down".into()))
    }

    async fn list_queues(&self) -> StoreResult<Vec<QueueDescriptor>> {
        Err(StoreError::Unavailable("down".into()))
    }

    async fn get_queue(&self, _name: &str) -> StoreResult<Option<QueueDescriptor>> {
        Err(StoreError::Unavailable("down".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn store_outage_trips_circuit_breaker_and_recovers_cadence() {
    let store = Arc::new(UnavailableStore::default());
    let processor = QueueProcessor::new(
        store.clone(),
        ProcessorConfig::new(Q).with_poll_delay(Duration::from_secs(30)),
        handler_fn(|_m: Message| async { Ok::<bool, HandlerError>(true) }),
    )
    .unwrap();

    processor.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.receives.load(Ordering::SeqCst), 16);
    let status = processor.status();
    assert_eq!(status.cooldowns, 1);
    assert_eq!(status.consecutive_errors, 0);

    // still cooling down just before the ten minutes are up
    tokio::time::sleep(Duration::from_secs(598)).await;
    assert_eq!(store.receives.load(Ordering::SeqCst), 16);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.receives.load(Ordering::SeqCst), 32);
    assert_eq!(processor.status().cooldowns, 2);

    processor.stop_and_join().await;
    assert!(!processor.is_running());
}

#[tokio::test(start_paused = true)]
async fn failing_handler_trips_circuit_breaker() {
    let (_clock, store) = fixed_store();
    // zero visibility timeout: the same message comes back every cycle
    store
        .create_queue(Q, QueueSettings::default().with_visibility_timeout(Duration::ZERO))
        .await
        .unwrap();
    store.send_message(Q, "boom".into(), None).await.unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let processor = QueueProcessor::new(
        store.clone(),
        ProcessorConfig::new(Q).with_poll_delay(Duration::from_secs(30)),
        handler_fn(move |_m: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<bool, HandlerError>("cannot handle".into())
            }
        }),
    )
    .unwrap();

    processor.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 16);
    let status = processor.status();
    assert_eq!(status.cooldowns, 1);
    assert_eq!(status.consecutive_errors, 0);

    processor.stop_and_join().await;
    assert_eq!(store.message_count(Q).await, 1);
}

/// Delegates to an in-memory store but refuses every delete.
struct DeleteRefusingStore {
    inner: Arc<InMemoryQueueStore>,
}

#[async_trait]
impl QueueStore for DeleteRefusingStore {
    async fn create_queue(&self, name: &str, settings: QueueSettings) -> StoreResult<()> {
        self.inner.create_queue(name, settings).await
    }

    async fn delete_queue(&self, name: &str) -> StoreResult<()> {
        self.inner.delete_queue(name).await
    }

    async fn send_message(
        &self,
        name: &str,
        body: String,
        delay: Option<Duration>,
    ) -> StoreResult<Option<MessageId>> {
        self.inner.send_message(name, body, delay).await
    }

    async fn delete_message(&self, _name: &str, id: MessageId) -> StoreResult<()> {
        Err(StoreError::Operation(format!("delete of {id} rejected")))
    }

    async fn receive_messages(&self, name: &str, max_count: usize) -> StoreResult<Vec<Message>> {
        self.inner.receive_messages(name, max_count).await
    }

    async fn list_queues(&self) -> StoreResult<Vec<QueueDescriptor>> {
        self.inner.list_queues().await
    }

    async fn get_queue(&self, name: &str) -> StoreResult<Option<QueueDescriptor>> {
        self.inner.get_queue(name).await
    }
}

#[tokio::test]
async fn failed_delete_keeps_message_and_fails_cycle() {
    let inner = Arc::new(InMemoryQueueStore::new());
    let store = Arc::new(DeleteRefusingStore {
        inner: Arc::clone(&inner),
    });
    store.create_queue(Q, QueueSettings::default()).await.unwrap();
    store.send_message(Q, "done".into(), None).await.unwrap();

    let processor = QueueProcessor::new(
        store,
        ProcessorConfig::new(Q),
        handler_fn(|_m: Message| async { Ok::<bool, HandlerError>(true) }),
    )
    .unwrap();

    let result = processor.poll_once().await;
    assert!(matches!(
        result,
        Err(PollqError::Store(StoreError::Operation(_)))
    ));
    assert_eq!(inner.message_count(Q).await, 1);
}

#[tokio::test]
async fn start_is_idempotent_and_stop_before_start_is_harmless() {
    let store = Arc::new(InMemoryQueueStore::new());
    let processor = QueueProcessor::new(
        store,
        ProcessorConfig::new(Q),
        handler_fn(|_m: Message| async { Ok::<bool, HandlerError>(true) }),
    )
    .unwrap();

    processor.stop();
    assert!(!processor.is_running());

    assert!(processor.start());
    assert!(!processor.start());
    assert!(processor.is_running());

    processor.stop_and_join().await;
    assert!(!processor.is_running());
}
