use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};

use super::CameraFrame;
use crate::error::{RenderError, Result};

/// Frames the capture side may run ahead of the render thread.
pub const DEFAULT_FRAME_QUEUE: usize = 4;

/// How often a throttled producer rechecks whether the receiver went away.
const BACKPRESSURE_POLL: Duration = Duration::from_millis(20);

/// How one output target consumes the shared frame stream.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DeliveryPolicy {
    /// Only the newest frame matters. Frames already superseded when the
    /// render thread gets to them are skipped for this target. Suits a live
    /// preview.
    #[default]
    LatestWins,
    /// Every frame is rendered, in order. While such a target is registered
    /// the producer is throttled instead of frames being replaced. Required
    /// for recording.
    Lossless,
}

#[derive(Debug, Default)]
struct Shared {
    dropped: AtomicU64,
    closed: AtomicBool,
    lossless: AtomicBool,
}

/// Creates the frame handoff between the capture side and the render thread.
///
/// The queue holds up to `capacity` frames. While no lossless target is
/// registered a full queue drops its oldest frame; otherwise the producer
/// waits for room.
pub fn frame_channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let shared = Arc::new(Shared::default());

    (
        FrameSender {
            tx,
            evict: rx.clone(),
            shared: Arc::clone(&shared),
        },
        FrameReceiver { rx, shared },
    )
}

/// Producer half; cloneable.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<CameraFrame>,
    /// Lets the producer discard the oldest queued frame when nothing needs it.
    evict: Receiver<CameraFrame>,
    shared: Arc<Shared>,
}

impl FrameSender {
    /// Hands `frame` over. Returns `Released` once the receiver is gone.
    ///
    /// Blocks only while a lossless target is registered and the queue is full.
    pub fn send(&self, frame: CameraFrame) -> Result<()> {
        let mut frame = frame;
        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(RenderError::Released);
            }

            if self.shared.lossless.load(Ordering::Acquire) {
                match self.tx.send_timeout(frame, BACKPRESSURE_POLL) {
                    Ok(()) => return Ok(()),
                    Err(SendTimeoutError::Timeout(back)) => frame = back,
                    Err(SendTimeoutError::Disconnected(_)) => return Err(RenderError::Released),
                }
                continue;
            }

            match self.tx.try_send(frame) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    frame = back;
                    if let Ok(stale) = self.evict.try_recv() {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                        log::trace!("replaced unconsumed frame {:?}", stale.timestamp());
                    }
                }
                Err(TrySendError::Disconnected(_)) => return Err(RenderError::Released),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

/// Outcome of a bounded wait on a [`FrameReceiver`].
#[derive(Debug)]
pub enum Recv {
    Frame(CameraFrame),
    Timeout,
    Closed,
}

/// Consumer half, owned by the render thread.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<CameraFrame>,
    shared: Arc<Shared>,
}

impl FrameReceiver {
    pub fn recv_timeout(&self, timeout: Duration) -> Recv {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Recv::Frame(frame),
            Err(RecvTimeoutError::Timeout) => Recv::Timeout,
            Err(RecvTimeoutError::Disconnected) => Recv::Closed,
        }
    }

    pub fn try_recv(&self) -> Option<CameraFrame> {
        self.rx.try_recv().ok()
    }

    /// A newer frame is already queued behind the one just taken.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    pub fn is_lossless(&self) -> bool {
        self.shared.lossless.load(Ordering::Acquire)
    }

    /// Switches the producer between replacing and waiting on a full queue.
    pub(crate) fn set_lossless(&self, lossless: bool) {
        if self.shared.lossless.swap(lossless, Ordering::AcqRel) != lossless {
            log::debug!("frame delivery is now {}", if lossless { "lossless" } else { "latest-wins" });
        }
    }

    /// Frames replaced in the queue before the render thread took them.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Underlying channel, for `crossbeam_channel::select!`.
    pub(crate) fn channel(&self) -> &Receiver<CameraFrame> {
        &self.rx
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}
