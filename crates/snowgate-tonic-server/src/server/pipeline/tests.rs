use super::*;
use portable_atomic::{AtomicU64, Ordering};
use snowgate_tonic_core::snowgate::{
    Component, Error as IdError, MonotonicClock, SnowflakeId, SnowflakeLayout,
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

const LAYOUT: SnowflakeLayout = SnowflakeLayout::TWITTER;
const TIMEOUT: Duration = Duration::from_millis(50);

/// A clock the test moves by hand.
#[derive(Clone)]
struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    fn at(millis: u64) -> Self {
        Self(Arc::new(AtomicU64::new(millis)))
    }

    fn set(&self, millis: u64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn current_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records every response, optionally holding the caller for `delay` first.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<IdExchange>>,
    delay: Duration,
    closed: bool,
}

impl RecordingSink {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn closed() -> Self {
        Self {
            closed: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<IdExchange> {
        self.sent.lock().unwrap().clone()
    }
}

impl ResponseSink for RecordingSink {
    async fn send(&self, response: IdExchange) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.closed {
            return Err(Error::Transport {
                context: "closed".to_string(),
            });
        }
        self.sent.lock().unwrap().push(response);
        Ok(())
    }
}

fn pipeline<T: TimeSource + Send + Sync>(capacity: usize, time: T) -> RequestPipeline<T> {
    RequestPipeline::new(
        AdmissionGate::new(capacity),
        SnowflakeGenerator::new(LAYOUT, time),
        TIMEOUT,
    )
}

#[tokio::test(start_paused = true)]
async fn success_sends_generated_id() {
    let pipeline = pipeline(1, ManualClock::at(1_000));
    let sink = RecordingSink::default();

    let response = pipeline.handle(IdExchange::new(3, 7), &sink).await.unwrap();

    assert_eq!(sink.sent(), vec![response]);
    assert_eq!(response.requestor_datacenter_id, 3);
    assert_eq!(response.requestor_machine_id, 7);
    let parts = LAYOUT.decompose(SnowflakeId::from_raw(response.result_id as u64));
    assert_eq!(parts.timestamp, 1_000);
    assert_eq!(parts.datacenter_id, 3);
    assert_eq!(parts.machine_id, 7);
    assert_eq!(pipeline.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_gate_answers_with_sentinel() {
    const CAPACITY: usize = 3;
    let pipeline = pipeline(CAPACITY, ManualClock::at(1));
    let mut held = Vec::new();
    for _ in 0..CAPACITY {
        held.push(pipeline.gate().acquire(TIMEOUT).await.unwrap());
    }

    let sink = RecordingSink::default();
    let start = Instant::now();
    let err = pipeline.handle(IdExchange::new(1, 2), &sink).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(elapsed >= TIMEOUT && elapsed < TIMEOUT + Duration::from_millis(2));
    assert_eq!(
        err,
        Error::Overload {
            timeout_ms: 50,
            waiting: 0,
            available: 0,
        }
    );
    assert_eq!(sink.sent(), vec![IdExchange::new(1, 2).respond(OVERLOAD_SENTINEL)]);

    drop(held);
    assert_eq!(pipeline.gate().available(), CAPACITY);
}

#[tokio::test(start_paused = true)]
async fn late_arrival_is_rejected_after_its_own_timeout() {
    // A holds the only permit for 200ms (its response is slow to deliver);
    // B arrives 10ms later and gives up 50ms after that.
    let pipeline = Arc::new(pipeline(1, ManualClock::at(1)));
    let start = Instant::now();

    let a = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move {
            let sink = RecordingSink::slow(Duration::from_millis(200));
            pipeline.handle(IdExchange::new(0, 1), &sink).await
        }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    let sink = RecordingSink::default();
    let err = pipeline.handle(IdExchange::new(0, 2), &sink).await.unwrap_err();
    let rejected_at = start.elapsed();

    assert!(matches!(err, Error::Overload { .. }));
    assert!(
        rejected_at >= Duration::from_millis(60) && rejected_at < Duration::from_millis(62),
        "rejected at {rejected_at:?}"
    );
    assert_eq!(sink.sent()[0].result_id, -1);

    let a = a.await.unwrap().unwrap();
    assert!(a.result_id > 0);
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(pipeline.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn clock_regression_fails_without_response() {
    let clock = ManualClock::at(100);
    let pipeline = pipeline(2, clock.clone());
    let sink = RecordingSink::default();

    let first = pipeline.handle(IdExchange::new(0, 0), &sink).await.unwrap();

    clock.set(90);
    let err = pipeline.handle(IdExchange::new(0, 0), &sink).await.unwrap_err();
    assert_eq!(
        err,
        Error::IdGeneration(IdError::ClockMovedBackward {
            drift_ms: 10,
            last_timestamp: 100,
            now: 90,
        })
    );
    assert_eq!(sink.sent(), vec![first]);
    assert_eq!(pipeline.gate().available(), 2);

    clock.set(100);
    let next = pipeline.handle(IdExchange::new(0, 0), &sink).await.unwrap();
    assert!(next.result_id > first.result_id);
}

#[tokio::test(start_paused = true)]
async fn invalid_component_is_not_answered_in_band() {
    let pipeline = pipeline(1, ManualClock::at(1));
    let sink = RecordingSink::default();

    let err = pipeline.handle(IdExchange::new(0, 32), &sink).await.unwrap_err();
    assert_eq!(
        err,
        Error::IdGeneration(IdError::InvalidIdentifierComponent {
            component: Component::Machine,
            value: 32,
            max: 31,
        })
    );

    let err = pipeline.handle(IdExchange::new(-1, 0), &sink).await.unwrap_err();
    assert!(matches!(
        err,
        Error::IdGeneration(IdError::InvalidIdentifierComponent {
            component: Component::Datacenter,
            ..
        })
    ));

    assert!(sink.sent().is_empty());
    assert_eq!(pipeline.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_still_releases_permit() {
    let pipeline = pipeline(1, ManualClock::at(1));

    let err = pipeline
        .handle(IdExchange::new(0, 0), &RecordingSink::closed())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(pipeline.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn closed_gate_reports_shutdown() {
    let pipeline = pipeline(1, ManualClock::at(1));
    pipeline.gate().close();
    let sink = RecordingSink::default();

    assert_eq!(
        pipeline.handle(IdExchange::new(0, 0), &sink).await,
        Err(Error::ServiceShutdown)
    );
    assert!(sink.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_unique_ids() {
    const TASKS: usize = 64;
    const IDS_PER_TASK: usize = 64;

    let pipeline = Arc::new(RequestPipeline::new(
        AdmissionGate::new(8),
        SnowflakeGenerator::new(LAYOUT, MonotonicClock::default()),
        Duration::from_secs(10),
    ));

    let tasks: Vec<_> = (0..TASKS)
        .map(|task| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let sink = RecordingSink::default();
                let machine_id = (task % 4) as i32;
                for _ in 0..IDS_PER_TASK {
                    pipeline
                        .handle(IdExchange::new(1, machine_id), &sink)
                        .await
                        .unwrap();
                }
                sink.sent()
            })
        })
        .collect();

    let mut seen = HashSet::with_capacity(TASKS * IDS_PER_TASK);
    for task in tasks {
        let sent = task.await.unwrap();
        for pair in sent.windows(2) {
            assert!(pair[0].result_id < pair[1].result_id);
        }
        for exchange in sent {
            assert!(exchange.result_id > 0);
            assert!(seen.insert(exchange.result_id), "duplicate id");
        }
    }
    assert_eq!(seen.len(), TASKS * IDS_PER_TASK);
    assert_eq!(pipeline.gate().available(), 8);
}
