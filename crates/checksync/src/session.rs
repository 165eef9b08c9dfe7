//! The sync session: fetch, extract, deliver, apply, persist.
//!
//! A [`SyncSession`] owns the one live (document, item list) pair. A load
//! replaces the pair as a whole; device events are applied against it until
//! the next load.

use checksync_core::{extract, ChecklistItem, DeviceIndex, Document, LineIndex, MarkerUpdate};
use checksync_device::{
    Delivery, DeliveryReport, DeviceChannel, DeviceEvent, OutboundMessage, RetryPolicy,
};
use checksync_store::{Credentials, DocumentLocation, DocumentStore};

use crate::config::{Settings, SyncConfig};
use crate::error::{Result, SessionError};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet.
    Idle,
    /// Fetching the remote document.
    Loading,
    /// Delivering items; `next_index` is the next one the device still needs.
    Streaming { next_index: DeviceIndex },
    /// The device has the full list.
    AwaitingEvents,
    /// The last load did not complete.
    Failed(String),
}

/// Outcome of a successful [`SyncSession::load_and_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Items delivered to the device.
    pub items: usize,
    /// Whether edits left over from a failed persist were saved first.
    pub flushed: bool,
    pub delivery: DeliveryReport,
}

/// What a device event did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The marker was flipped.
    Applied { index: DeviceIndex, line: LineIndex },
    /// The line did not carry the opposite marker, so nothing changed.
    Unchanged { index: DeviceIndex, line: LineIndex },
    /// The event carried no toggle.
    Ignored,
}

/// The live document and the items extracted from it.
struct Checklist {
    document: Document,
    items: Vec<ChecklistItem>,
    location: DocumentLocation,
    credentials: Credentials,
}

/// Synchronizes one checklist document with one device.
pub struct SyncSession<S: DocumentStore, C: DeviceChannel> {
    store: S,
    channel: C,
    settings: Settings,
    config: SyncConfig,
    retry: Box<dyn RetryPolicy>,
    state: SessionState,
    checklist: Option<Checklist>,
    /// Local edits the store has not accepted yet.
    dirty: bool,
}

impl<S: DocumentStore, C: DeviceChannel> SyncSession<S, C> {
    /// Create a session using the retry policy from `config`.
    pub fn new(store: S, channel: C, settings: Settings, config: SyncConfig) -> Self {
        let retry = Box::new(config.retry.clone());
        Self {
            store,
            channel,
            settings,
            config,
            retry,
            state: SessionState::Idle,
            checklist: None,
            dirty: false,
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Box::new(policy);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Items of the most recent extraction.
    pub fn items(&self) -> &[ChecklistItem] {
        match &self.checklist {
            Some(checklist) => &checklist.items,
            None => &[],
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.checklist.as_ref().map(|c| &c.document)
    }

    /// Whether local edits are waiting to be persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Replace the settings. Takes effect on the next load.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Fetch the document, extract its items and deliver them to the device.
    ///
    /// Fails without touching the device if settings are missing. Edits left
    /// over from a failed persist are saved before fetching; if that save
    /// fails again the fetched copy wins.
    pub async fn load_and_sync(&mut self) -> Result<SyncReport> {
        let (location, credentials) = match self.settings.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(error = %e, "sync not attempted");
                self.state = SessionState::Failed(e.to_string());
                return Err(e);
            }
        };

        self.state = SessionState::Loading;
        tracing::info!(location = %location, "loading checklist");

        let flushed = self.flush_pending().await;

        self.notice(OutboundMessage::status("Loading...")).await;
        self.notice(OutboundMessage::Progressing(true)).await;

        let text = match self.store.fetch(&location, &credentials).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, location = %location, "fetch failed");
                self.state = SessionState::Failed(e.to_string());
                self.notice(OutboundMessage::status("Sync failed")).await;
                self.notice(OutboundMessage::Progressing(false)).await;
                return Err(SessionError::Fetch(e));
            }
        };

        let document = Document::load(&text);
        let items = extract(&document);
        let title = self
            .config
            .list_title
            .clone()
            .or_else(|| document.title().map(str::to_owned));
        let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();

        tracing::info!(items = items.len(), lines = document.line_count(), "checklist loaded");
        self.checklist = Some(Checklist {
            document,
            items,
            location,
            credentials,
        });
        self.dirty = false;

        if let Some(title) = title {
            self.notice(OutboundMessage::title(&title)).await;
        }

        let result = match Delivery::new(names) {
            Ok(delivery) => self.deliver(delivery).await,
            Err(e) => Err(e),
        };

        self.notice(OutboundMessage::Progressing(false)).await;

        match result {
            Ok(delivery) => {
                for event in &delivery.stale_events {
                    tracing::warn!(?event, "discarding event for a superseded list");
                }
                self.state = SessionState::AwaitingEvents;
                self.notice(OutboundMessage::status("")).await;
                Ok(SyncReport {
                    items: delivery.items,
                    flushed,
                    delivery,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "delivery failed");
                self.state = SessionState::Failed(e.to_string());
                self.notice(OutboundMessage::status("Sync failed")).await;
                Err(SessionError::Delivery(e))
            }
        }
    }

    async fn deliver(
        &mut self,
        mut delivery: Delivery,
    ) -> checksync_device::Result<DeliveryReport> {
        let Self {
            channel,
            retry,
            state,
            ..
        } = self;

        delivery
            .run(&*channel, &**retry, |progress| {
                if let Some(next_index) = progress.next_index() {
                    *state = SessionState::Streaming { next_index };
                }
            })
            .await
    }

    /// Apply a device event to the document and persist the result.
    ///
    /// Indices are validated against the most recent extraction. A toggle
    /// that finds the line already in the requested state changes nothing,
    /// but still persists when earlier edits are pending.
    pub async fn on_device_event(&mut self, event: DeviceEvent) -> Result<EventOutcome> {
        let Some((raw, checked)) = event.toggle() else {
            tracing::debug!("ignoring device event without a toggle");
            return Ok(EventOutcome::Ignored);
        };

        let Some(checklist) = self.checklist.as_mut() else {
            return Err(SessionError::InvalidItemIndex { index: raw, len: 0 });
        };
        let len = checklist.items.len();
        let index = DeviceIndex::checked(raw, len)
            .ok_or(SessionError::InvalidItemIndex { index: raw, len })?;

        let item = &mut checklist.items[index.as_usize()];
        let line = item.source_line;
        let update = checklist
            .document
            .set_checked_marker_at(line, item.marker_offset, checked)?;

        let outcome = match update {
            MarkerUpdate::Applied => {
                item.checked = checked;
                tracing::info!(index = %index, line = %line, checked, "device event applied");
                EventOutcome::Applied { index, line }
            }
            MarkerUpdate::Mismatch => {
                tracing::debug!(index = %index, line = %line, checked, "marker mismatch, nothing to change");
                EventOutcome::Unchanged { index, line }
            }
        };

        if matches!(outcome, EventOutcome::Applied { .. }) || self.dirty {
            self.persist().await?;
        }
        Ok(outcome)
    }

    /// Serialize the document and store it at the location it was loaded from.
    ///
    /// On failure the in-memory document is kept and marked dirty.
    pub async fn persist(&mut self) -> Result<()> {
        let checklist = self.checklist.as_ref().ok_or(SessionError::NotLoaded)?;
        let text = checklist.document.serialize();

        let result = self
            .store
            .store(&checklist.location, &checklist.credentials, &text)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(bytes = text.len(), location = %checklist.location, "checklist saved");
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, location = %checklist.location, "save failed");
                self.dirty = true;
                self.notice(OutboundMessage::status("Save failed")).await;
                Err(SessionError::PersistFailed(e))
            }
        }
    }

    /// Load once, then apply device events until the channel closes.
    pub async fn run(&mut self) {
        if let Err(e) = self.load_and_sync().await {
            tracing::warn!(error = %e, "initial sync failed");
        }

        while let Some(event) = self.channel.recv().await {
            if let Err(e) = self.on_device_event(event).await {
                tracing::warn!(error = %e, ?event, "device event dropped");
            }
        }
        tracing::info!("device channel closed");
    }

    async fn flush_pending(&mut self) -> bool {
        if !self.dirty || self.checklist.is_none() {
            return false;
        }
        match self.persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "pending edits dropped in favour of the remote copy");
                false
            }
        }
    }

    /// Send a best-effort notice: one attempt, failures ignored.
    async fn notice(&self, message: OutboundMessage) {
        if !self.config.notices {
            return;
        }
        if let Err(e) = self.channel.send(&message).await {
            tracing::debug!(error = %e, ?message, "notice not delivered");
        }
    }
}
