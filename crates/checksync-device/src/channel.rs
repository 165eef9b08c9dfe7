//! Channel abstraction for talking to the device.
//!
//! [`DeviceChannel`] deals in typed messages and events. [`FramedChannel`]
//! adapts a raw byte link ([`FrameLink`]) to it by running the wire codec,
//! so business logic never sees key spellings or frame bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::{decode_event, encode_message};
use crate::error::Result;
use crate::messages::{DeviceEvent, MessageKeys, OutboundMessage};

/// Typed, strictly ordered channel to the device.
///
/// `send` resolves once the device has acknowledged or rejected the message.
/// The channel itself does not stop a caller from overlapping sends; the
/// delivery protocol keeps at most one in flight.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Send one message and wait for the verdict.
    async fn send(&self, message: &OutboundMessage) -> Result<()>;

    /// Wait for the next inbound event. Returns `None` once the channel is closed.
    async fn recv(&self) -> Option<DeviceEvent>;

    /// Take an inbound event that has already arrived, without waiting.
    fn try_recv(&self) -> Option<DeviceEvent>;
}

#[async_trait]
impl<C: DeviceChannel + ?Sized> DeviceChannel for std::sync::Arc<C> {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        (**self).send(message).await
    }

    async fn recv(&self) -> Option<DeviceEvent> {
        (**self).recv().await
    }

    fn try_recv(&self) -> Option<DeviceEvent> {
        (**self).try_recv()
    }
}

/// Raw frame link: the transport underneath a [`FramedChannel`].
#[async_trait]
pub trait FrameLink: Send + Sync {
    /// Send one frame and wait for the verdict.
    async fn send_frame(&self, frame: Bytes) -> Result<()>;

    /// Wait for the next inbound frame. Returns `None` once the link is closed.
    async fn recv_frame(&self) -> Option<Bytes>;

    /// Take an inbound frame that has already arrived, without waiting.
    fn try_recv_frame(&self) -> Option<Bytes>;
}

/// A [`DeviceChannel`] over a [`FrameLink`], using the CBOR wire codec.
pub struct FramedChannel<L> {
    link: L,
    keys: MessageKeys,
}

impl<L: FrameLink> FramedChannel<L> {
    pub fn new(link: L, keys: MessageKeys) -> Self {
        Self { link, keys }
    }

    fn decode(&self, frame: &Bytes) -> Option<DeviceEvent> {
        match decode_event(frame, &self.keys) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, frame = %hex::encode(frame), "dropping undecodable frame");
                None
            }
        }
    }
}

#[async_trait]
impl<L: FrameLink> DeviceChannel for FramedChannel<L> {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let frame = encode_message(message, &self.keys)?;
        tracing::trace!(frame = %hex::encode(&frame), "sending frame");
        self.link.send_frame(frame).await
    }

    async fn recv(&self) -> Option<DeviceEvent> {
        loop {
            let frame = self.link.recv_frame().await?;
            tracing::trace!(frame = %hex::encode(&frame), "received frame");
            if let Some(event) = self.decode(&frame) {
                return Some(event);
            }
        }
    }

    fn try_recv(&self) -> Option<DeviceEvent> {
        loop {
            let frame = self.link.try_recv_frame()?;
            if let Some(event) = self.decode(&frame) {
                return Some(event);
            }
        }
    }
}

/// An in-memory link for testing.
///
/// Uses channels to connect the companion end ([`MemoryLink`]) to a
/// simulated device end ([`MemoryDevice`]) that decides each frame's verdict.
pub mod memory {
    use super::*;
    use crate::error::DeviceError;
    use tokio::sync::{mpsc, oneshot, Mutex};

    /// A frame waiting for the device's verdict.
    struct Pending {
        frame: Bytes,
        verdict: oneshot::Sender<Result<()>>,
    }

    /// Create a connected pair of link ends.
    pub fn link(capacity: usize) -> (MemoryLink, MemoryDevice) {
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let link = MemoryLink {
            outbound: frame_tx,
            inbound: Mutex::new(event_rx),
        };
        let device = MemoryDevice {
            frames: Mutex::new(frame_rx),
            events: event_tx,
        };
        (link, device)
    }

    /// Companion end of an in-memory link.
    pub struct MemoryLink {
        outbound: mpsc::Sender<Pending>,
        inbound: Mutex<mpsc::Receiver<Bytes>>,
    }

    #[async_trait]
    impl FrameLink for MemoryLink {
        async fn send_frame(&self, frame: Bytes) -> Result<()> {
            let (verdict, outcome) = oneshot::channel();
            self.outbound
                .send(Pending { frame, verdict })
                .await
                .map_err(|_| DeviceError::Disconnected)?;
            outcome.await.map_err(|_| DeviceError::Disconnected)?
        }

        async fn recv_frame(&self) -> Option<Bytes> {
            self.inbound.lock().await.recv().await
        }

        fn try_recv_frame(&self) -> Option<Bytes> {
            self.inbound.try_lock().ok()?.try_recv().ok()
        }
    }

    /// Device end of an in-memory link.
    pub struct MemoryDevice {
        frames: Mutex<mpsc::Receiver<Pending>>,
        events: mpsc::Sender<Bytes>,
    }

    impl MemoryDevice {
        /// Wait for the next frame sent by the companion.
        pub async fn next_frame(&self) -> Option<IncomingFrame> {
            let pending = self.frames.lock().await.recv().await?;
            Some(IncomingFrame {
                frame: pending.frame,
                verdict: pending.verdict,
            })
        }

        /// Send a frame to the companion.
        pub async fn send_frame(&self, frame: Bytes) -> Result<()> {
            self.events
                .send(frame)
                .await
                .map_err(|_| DeviceError::Disconnected)
        }
    }

    /// A frame received by the device, awaiting a verdict.
    ///
    /// Dropping it without a verdict reports the link as disconnected.
    pub struct IncomingFrame {
        frame: Bytes,
        verdict: oneshot::Sender<Result<()>>,
    }

    impl IncomingFrame {
        pub fn frame(&self) -> &Bytes {
            &self.frame
        }

        /// Acknowledge the frame.
        pub fn ack(self) {
            let _ = self.verdict.send(Ok(()));
        }

        /// Report the frame as not delivered.
        pub fn reject(self, reason: &str) {
            let _ = self.verdict.send(Err(DeviceError::Rejected(reason.to_owned())));
        }
    }
}
