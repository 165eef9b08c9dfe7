//! Acknowledged, one-message-in-flight delivery of an item list.
//!
//! The device first receives the item count, then every item in ascending
//! index order. Each message is sent only after the previous one was
//! acknowledged, and a failed message is resent until the retry policy
//! gives up.
//!
//! ```text
//! Idle -> CountPending -> ItemPending(0) -> ... -> ItemPending(n-1) -> Done
//!              |  ^              |  ^
//!              +--+ (failure)    +--+ (failure)
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use checksync_core::DeviceIndex;

use crate::channel::DeviceChannel;
use crate::error::{DeviceError, Result};
use crate::messages::{DeviceEvent, OutboundMessage};

/// Which protocol message a delivery is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Count,
    Item(DeviceIndex),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Count => write!(f, "count"),
            Stage::Item(index) => write!(f, "item {index}"),
        }
    }
}

/// Decides how long to wait before resending a failed message.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next attempt, after `failures` consecutive failures
    /// of the same message. `None` gives up.
    fn delay_for(&self, failures: u32) -> Option<Duration>;
}

/// Constant delay between attempts, optionally capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedDelay {
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    /// Attempts per message before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl RetryPolicy for FixedDelay {
    fn delay_for(&self, failures: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if failures >= max => None,
            _ => Some(self.delay),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Delivery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Nothing sent yet.
    Idle,
    /// Waiting for the count to be acknowledged.
    CountPending { failures: u32 },
    /// Waiting for the item at `index` to be acknowledged.
    ItemPending { index: DeviceIndex, failures: u32 },
    /// Every message was acknowledged.
    Done,
    /// The retry policy gave up at `stage`.
    Abandoned { stage: Stage },
}

impl DeliveryState {
    /// Index of the next item the device still has to receive.
    pub fn next_index(&self) -> Option<DeviceIndex> {
        match *self {
            DeliveryState::CountPending { .. } => Some(DeviceIndex(0)),
            DeliveryState::ItemPending { index, .. } => Some(index),
            _ => None,
        }
    }
}

/// Outcome of a completed delivery run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of items delivered.
    pub items: usize,
    /// Send attempts, failed ones included.
    pub attempts: u32,
    /// Failed send attempts.
    pub failures: u32,
    /// Inbound events that arrived while an earlier message was in flight.
    pub stale_events: Vec<DeviceEvent>,
}

/// Delivery of one item list.
#[derive(Debug)]
pub struct Delivery {
    names: Vec<String>,
    count: u32,
    state: DeliveryState,
}

impl Delivery {
    /// Prepare delivery of `names`, in order.
    pub fn new(names: Vec<String>) -> Result<Self> {
        let count = u32::try_from(names.len()).map_err(|_| {
            DeviceError::Encode(format!("{} items exceed the device index range", names.len()))
        })?;
        Ok(Self {
            names,
            count,
            state: DeliveryState::Idle,
        })
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Begin with the count message.
    pub fn start(&mut self) {
        self.state = DeliveryState::CountPending { failures: 0 };
    }

    /// The message in flight, if any.
    pub fn pending(&self) -> Option<(Stage, OutboundMessage)> {
        match self.state {
            DeliveryState::CountPending { .. } => {
                Some((Stage::Count, OutboundMessage::ItemsCount(self.count)))
            }
            DeliveryState::ItemPending { index, .. } => {
                let name = self.names.get(index.as_usize())?;
                Some((Stage::Item(index), OutboundMessage::item(index, name)))
            }
            _ => None,
        }
    }

    /// Record an acknowledgement of the pending message.
    pub fn on_ack(&mut self) {
        let next = match self.state {
            DeliveryState::CountPending { .. } => 0,
            DeliveryState::ItemPending { index, .. } => index.0 + 1,
            _ => return,
        };
        self.state = if next < self.count {
            DeliveryState::ItemPending {
                index: DeviceIndex(next),
                failures: 0,
            }
        } else {
            DeliveryState::Done
        };
    }

    /// Record a failure of the pending message. Returns the consecutive
    /// failure count of that message.
    pub fn on_failure(&mut self) -> u32 {
        match &mut self.state {
            DeliveryState::CountPending { failures }
            | DeliveryState::ItemPending { failures, .. } => {
                *failures += 1;
                *failures
            }
            _ => 0,
        }
    }

    /// Drive the delivery to completion over `channel`.
    ///
    /// `on_progress` observes every state the delivery passes through. Every
    /// run starts over from the count, so a device that lost its list midway
    /// is never left with a partial one.
    pub async fn run<C, P>(
        &mut self,
        channel: &C,
        policy: &P,
        mut on_progress: impl FnMut(&DeliveryState) + Send,
    ) -> Result<DeliveryReport>
    where
        C: DeviceChannel + ?Sized,
        P: RetryPolicy + ?Sized,
    {
        self.start();
        on_progress(&self.state);

        let mut report = DeliveryReport {
            items: self.names.len(),
            ..DeliveryReport::default()
        };

        while let Some((stage, message)) = self.pending() {
            report
                .stale_events
                .extend(std::iter::from_fn(|| channel.try_recv()));
            report.attempts += 1;

            match channel.send(&message).await {
                Ok(()) => {
                    tracing::debug!(stage = %stage, "acknowledged");
                    self.on_ack();
                }
                Err(error) => {
                    report.failures += 1;
                    let failures = self.on_failure();
                    tracing::warn!(stage = %stage, attempt = failures, error = %error, "delivery failed");

                    let delay = if error.is_retryable() {
                        policy.delay_for(failures)
                    } else {
                        None
                    };
                    match delay {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            self.state = DeliveryState::Abandoned { stage };
                            on_progress(&self.state);
                            return Err(DeviceError::GaveUp {
                                stage,
                                failures,
                                last: Box::new(error),
                            });
                        }
                    }
                }
            }
            on_progress(&self.state);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Channel that fails according to a queue of verdicts, then acks.
    #[derive(Default)]
    struct FlakyChannel {
        verdicts: Mutex<VecDeque<Result<()>>>,
        sent: Mutex<Vec<OutboundMessage>>,
        inbound: Mutex<VecDeque<DeviceEvent>>,
    }

    impl FlakyChannel {
        fn with_verdicts(verdicts: Vec<Result<()>>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into()),
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<OutboundMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeviceChannel for FlakyChannel {
        async fn send(&self, message: &OutboundMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            self.verdicts.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn recv(&self) -> Option<DeviceEvent> {
            self.inbound.lock().unwrap().pop_front()
        }

        fn try_recv(&self) -> Option<DeviceEvent> {
            self.inbound.lock().unwrap().pop_front()
        }
    }

    fn rejected() -> Result<()> {
        Err(DeviceError::Rejected("busy".into()))
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn no_wait() -> FixedDelay {
        FixedDelay::new(Duration::ZERO)
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut delivery = Delivery::new(names(&["a", "b"])).unwrap();
        assert_eq!(delivery.state(), DeliveryState::Idle);
        assert!(delivery.pending().is_none());

        delivery.start();
        assert_eq!(delivery.pending().unwrap().1, OutboundMessage::ItemsCount(2));

        assert_eq!(delivery.on_failure(), 1);
        assert_eq!(delivery.on_failure(), 2);
        assert_eq!(delivery.state(), DeliveryState::CountPending { failures: 2 });

        delivery.on_ack();
        assert_eq!(
            delivery.state(),
            DeliveryState::ItemPending { index: DeviceIndex(0), failures: 0 }
        );
        delivery.on_ack();
        delivery.on_ack();
        assert_eq!(delivery.state(), DeliveryState::Done);
        assert!(delivery.pending().is_none());
    }

    #[test]
    fn test_fixed_delay_policy() {
        let unbounded = FixedDelay::default();
        assert_eq!(unbounded.delay_for(1), Some(Duration::from_millis(500)));
        assert_eq!(unbounded.delay_for(10_000), Some(Duration::from_millis(500)));

        let bounded = FixedDelay::new(Duration::from_millis(10)).with_max_attempts(3);
        assert_eq!(bounded.delay_for(2), Some(Duration::from_millis(10)));
        assert_eq!(bounded.delay_for(3), None);
    }

    #[test]
    fn test_fixed_delay_serde() {
        let policy: FixedDelay = serde_json::from_str(r#"{"delay_ms":250}"#).unwrap();
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, None);

        let json = serde_json::to_string(&FixedDelay::new(Duration::from_secs(1))).unwrap();
        assert_eq!(json, r#"{"delay_ms":1000,"max_attempts":null}"#);
    }

    #[tokio::test]
    async fn test_run_delivers_in_order() {
        let channel = FlakyChannel::default();
        let mut delivery = Delivery::new(names(&["Buy milk", "Call Bob"])).unwrap();

        let report = delivery.run(&channel, &no_wait(), |_| {}).await.unwrap();
        assert_eq!(report.items, 2);
        assert_eq!(report.attempts, 3);
        assert_eq!(
            channel.sent(),
            vec![
                OutboundMessage::ItemsCount(2),
                OutboundMessage::item(DeviceIndex(0), "Buy milk"),
                OutboundMessage::item(DeviceIndex(1), "Call Bob"),
            ]
        );
        assert_eq!(delivery.state(), DeliveryState::Done);
    }

    #[tokio::test]
    async fn test_run_empty_list_sends_only_count() {
        let channel = FlakyChannel::default();
        let mut delivery = Delivery::new(Vec::new()).unwrap();

        delivery.run(&channel, &no_wait(), |_| {}).await.unwrap();
        assert_eq!(channel.sent(), vec![OutboundMessage::ItemsCount(0)]);
        assert_eq!(delivery.state(), DeliveryState::Done);
    }

    #[tokio::test]
    async fn test_run_retries_same_item() {
        // count ok, item 0 ok, item 1 fails twice
        let channel = FlakyChannel::with_verdicts(vec![Ok(()), Ok(()), rejected(), rejected()]);
        let mut delivery = Delivery::new(names(&["a", "b"])).unwrap();

        let report = delivery.run(&channel, &no_wait(), |_| {}).await.unwrap();
        assert_eq!(report.failures, 2);
        let sent = channel.sent();
        assert_eq!(sent.len(), 5);
        assert!(sent[2..]
            .iter()
            .all(|m| *m == OutboundMessage::item(DeviceIndex(1), "b")));
    }

    #[tokio::test]
    async fn test_run_count_failure_restarts_from_count() {
        let channel = FlakyChannel::with_verdicts(vec![rejected()]);
        let mut delivery = Delivery::new(names(&["a"])).unwrap();

        delivery.run(&channel, &no_wait(), |_| {}).await.unwrap();
        assert_eq!(
            channel.sent(),
            vec![
                OutboundMessage::ItemsCount(1),
                OutboundMessage::ItemsCount(1),
                OutboundMessage::item(DeviceIndex(0), "a"),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_gives_up_when_policy_exhausted() {
        let channel = FlakyChannel::with_verdicts(vec![Ok(()), rejected(), rejected()]);
        let mut delivery = Delivery::new(names(&["a", "b"])).unwrap();
        let policy = no_wait().with_max_attempts(2);

        let err = delivery.run(&channel, &policy, |_| {}).await.unwrap_err();
        match err {
            DeviceError::GaveUp { stage, failures, last } => {
                assert_eq!(stage, Stage::Item(DeviceIndex(0)));
                assert_eq!(failures, 2);
                assert_eq!(*last, DeviceError::Rejected("busy".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            delivery.state(),
            DeliveryState::Abandoned { stage: Stage::Item(DeviceIndex(0)) }
        );

        // A second run starts over from the count.
        delivery.run(&channel, &policy, |_| {}).await.unwrap();
        let sent = channel.sent();
        assert_eq!(sent[3], OutboundMessage::ItemsCount(2));
        assert_eq!(sent[4], OutboundMessage::item(DeviceIndex(0), "a"));
        assert_eq!(delivery.state(), DeliveryState::Done);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_disconnect() {
        let channel = FlakyChannel::with_verdicts(vec![Err(DeviceError::Disconnected)]);
        let mut delivery = Delivery::new(names(&["a"])).unwrap();

        let err = delivery.run(&channel, &FixedDelay::default(), |_| {}).await.unwrap_err();
        assert!(matches!(err, DeviceError::GaveUp { stage: Stage::Count, failures: 1, .. }));
        assert_eq!(channel.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_run_collects_stale_events() {
        let channel = FlakyChannel::default();
        channel.inbound.lock().unwrap().push_back(DeviceEvent::ItemChecked(3));
        let mut delivery = Delivery::new(names(&["a"])).unwrap();

        let report = delivery.run(&channel, &no_wait(), |_| {}).await.unwrap();
        assert_eq!(report.stale_events, vec![DeviceEvent::ItemChecked(3)]);
    }

    #[tokio::test]
    async fn test_run_reports_progress() {
        let channel = FlakyChannel::default();
        let mut delivery = Delivery::new(names(&["a", "b"])).unwrap();
        let mut seen = Vec::new();

        delivery
            .run(&channel, &no_wait(), |state| seen.push(state.next_index()))
            .await
            .unwrap();
        assert_eq!(
            seen,
            vec![
                Some(DeviceIndex(0)),
                Some(DeviceIndex(0)),
                Some(DeviceIndex(1)),
                None,
            ]
        );
    }
}
