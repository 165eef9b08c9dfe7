//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use checksync::{Settings, SyncConfig, SyncSession};
use checksync_device::{DeviceChannel, DeviceError, DeviceEvent, FixedDelay, OutboundMessage};
use checksync_store::{DocumentLocation, MemoryStore};

/// The list used throughout the examples: two outstanding items around a done one.
pub const SHOPPING_LIST: &str = "- [ ] Buy milk\n- [x] Pay rent\n- [ ] Call Bob\n";

/// A list with a heading, prose, nesting and Windows line endings.
pub const MIXED_LIST: &str = "# Weekend\r\n\r\nSome notes.\r\n  - [ ] Water plants\r\n- [x] Laundry\r\n-  [ ] not an item\r\n- [ ] Fix [ ] bracket\r\n";

/// A channel that fails on a schedule and records everything it sees.
///
/// The failure plan is consumed per protocol message: the k-th count or item
/// message is rejected `plan[k]` times before it is acknowledged. Notices are
/// acknowledged unless [`ScriptedChannel::fail_notices`] is set.
#[derive(Default)]
pub struct ScriptedChannel {
    inner: Mutex<ScriptedInner>,
    inbound: Notify,
}

#[derive(Default)]
struct ScriptedInner {
    plan: VecDeque<u32>,
    /// Rejections left for the message currently being delivered.
    pending_failures: Option<u32>,
    disconnected: bool,
    fail_notices: bool,
    attempts: Vec<OutboundMessage>,
    delivered: Vec<OutboundMessage>,
    events: VecDeque<DeviceEvent>,
    closed: bool,
}

impl ScriptedChannel {
    /// A channel that acknowledges everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failures(plan: impl IntoIterator<Item = u32>) -> Self {
        let channel = Self::default();
        channel.inner.lock().unwrap().plan = plan.into_iter().collect();
        channel
    }

    /// Reject every notice.
    pub fn fail_notices(self) -> Self {
        self.inner.lock().unwrap().fail_notices = true;
        self
    }

    /// Make every further send report a closed link.
    pub fn disconnect(&self) {
        self.inner.lock().unwrap().disconnected = true;
    }

    /// Queue an event from the device.
    pub fn push_event(&self, event: DeviceEvent) {
        self.inner.lock().unwrap().events.push_back(event);
        self.inbound.notify_one();
    }

    /// End the inbound stream once queued events are drained.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.inbound.notify_one();
    }

    /// Every send attempt, in order.
    pub fn attempts(&self) -> Vec<OutboundMessage> {
        self.inner.lock().unwrap().attempts.clone()
    }

    /// Acknowledged messages, notices included.
    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.inner.lock().unwrap().delivered.clone()
    }

    /// Acknowledged count and item messages.
    pub fn protocol_messages(&self) -> Vec<OutboundMessage> {
        self.delivered()
            .into_iter()
            .filter(|m| !m.is_notice())
            .collect()
    }

    /// Acknowledged item names, in order.
    pub fn item_names(&self) -> Vec<String> {
        self.delivered()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Item { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeviceChannel for ScriptedChannel {
    async fn send(&self, message: &OutboundMessage) -> checksync_device::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.attempts.push(message.clone());

        if inner.disconnected {
            return Err(DeviceError::Disconnected);
        }

        if message.is_notice() {
            if inner.fail_notices {
                return Err(DeviceError::Rejected("notice refused".into()));
            }
            inner.delivered.push(message.clone());
            return Ok(());
        }

        let left = match inner.pending_failures {
            Some(left) => left,
            None => inner.plan.pop_front().unwrap_or(0),
        };
        if left > 0 {
            inner.pending_failures = Some(left - 1);
            return Err(DeviceError::Rejected(format!("scripted failure, {} left", left - 1)));
        }

        inner.pending_failures = None;
        inner.delivered.push(message.clone());
        Ok(())
    }

    async fn recv(&self) -> Option<DeviceEvent> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(event) = inner.events.pop_front() {
                    return Some(event);
                }
                if inner.closed {
                    return None;
                }
            }
            self.inbound.notified().await;
        }
    }

    fn try_recv(&self) -> Option<DeviceEvent> {
        self.inner.lock().unwrap().events.pop_front()
    }
}

/// A store, a scripted channel and the settings pointing at one document.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub channel: Arc<ScriptedChannel>,
    pub location: DocumentLocation,
}

impl TestFixture {
    pub const URL: &'static str = "https://dav.example/remote.php/dav/files/alice/Checklist.md";

    /// A fixture whose remote document holds `text`.
    pub fn new(text: &str) -> Self {
        Self::with_channel(text, ScriptedChannel::new())
    }

    pub fn with_channel(text: &str, channel: ScriptedChannel) -> Self {
        let location = DocumentLocation::new(Self::URL);
        let store = Arc::new(MemoryStore::new());
        store.insert(&location, text);
        Self {
            store,
            channel: Arc::new(channel),
            location,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::new(Self::URL, "alice", "app-password")
    }

    /// Config that retries immediately and sends no notices.
    pub fn quiet_config() -> SyncConfig {
        SyncConfig {
            retry: FixedDelay::new(Duration::ZERO),
            notices: false,
            ..SyncConfig::default()
        }
    }

    /// A session over this fixture's store and channel.
    pub fn session(&self, config: SyncConfig) -> SyncSession<Arc<MemoryStore>, Arc<ScriptedChannel>> {
        SyncSession::new(
            self.store.clone(),
            self.channel.clone(),
            self.settings(),
            config,
        )
    }

    /// The document as the remote store currently holds it.
    pub fn remote_text(&self) -> Option<String> {
        self.store.get(&self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checksync_core::DeviceIndex;

    #[tokio::test]
    async fn test_scripted_channel_follows_plan() {
        let channel = ScriptedChannel::with_failures([0, 2]);
        let count = OutboundMessage::ItemsCount(1);
        let item = OutboundMessage::item(DeviceIndex(0), "a");

        assert!(channel.send(&count).await.is_ok());
        assert!(channel.send(&item).await.is_err());
        assert!(channel.send(&item).await.is_err());
        assert!(channel.send(&item).await.is_ok());

        assert_eq!(channel.attempts().len(), 4);
        assert_eq!(channel.protocol_messages(), vec![count, item]);
    }

    #[tokio::test]
    async fn test_scripted_channel_notices() {
        let channel = ScriptedChannel::new().fail_notices();
        let notice = OutboundMessage::Progressing(true);
        assert!(channel.send(&notice).await.is_err());
        assert!(channel.delivered().is_empty());
        // Notices do not consume the plan.
        assert!(channel.send(&OutboundMessage::ItemsCount(0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_channel_events_then_close() {
        let channel = ScriptedChannel::new();
        channel.push_event(DeviceEvent::ItemChecked(0));
        channel.close();

        assert_eq!(channel.recv().await, Some(DeviceEvent::ItemChecked(0)));
        assert_eq!(channel.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let channel = Arc::new(ScriptedChannel::new());
        let pusher = channel.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            pusher.push_event(DeviceEvent::ItemUnchecked(2));
        });
        assert_eq!(channel.recv().await, Some(DeviceEvent::ItemUnchecked(2)));
    }

    #[test]
    fn test_fixture_holds_document() {
        let fixture = TestFixture::new(SHOPPING_LIST);
        assert_eq!(fixture.remote_text().as_deref(), Some(SHOPPING_LIST));
        assert!(fixture.settings().resolve().is_ok());
    }
}
