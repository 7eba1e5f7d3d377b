//! Connects a runtime to the outside world: frame requests and cross-thread invalidation.

use crate::component::ComponentId;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;

/// Requests a callback before the next paint.
///
/// Requests are expected to coalesce: any number of requests before the callback fires result
/// in a single callback, which should call [`Runtime::flush`](crate::Runtime::flush).
pub trait Frames {
    fn request_frame(&mut self);
}

/// Does nothing; the embedder calls `flush` on its own schedule.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualFrames;

impl Frames for ManualFrames {
    fn request_frame(&mut self) {}
}

/// Frame requests delivered over a channel.
///
/// The channel holds at most one pending request, so repeated requests coalesce.
#[derive(Debug, Clone)]
pub struct ChannelFrames {
    sender: Sender<()>,
}

/// The receiving end of [`ChannelFrames`], owned by whatever drives the frame loop.
#[derive(Debug)]
pub struct FrameReceiver {
    receiver: Receiver<()>,
}

impl ChannelFrames {
    pub fn new() -> (ChannelFrames, FrameReceiver) {
        let (sender, receiver) = channel::bounded(1);
        (ChannelFrames { sender }, FrameReceiver { receiver })
    }
}

impl Frames for ChannelFrames {
    fn request_frame(&mut self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => (),
            Err(TrySendError::Disconnected(())) => {
                tracing::warn!("frame request dropped: frame receiver has been disconnected")
            }
        }
    }
}

impl FrameReceiver {
    /// Returns true if a frame was requested, without blocking.
    pub fn try_recv(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Waits up to `timeout` for a frame request.
    pub fn recv_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// A `Send` handle that invalidates components from other threads or callbacks.
///
/// Invalidations are queued and applied by [`Runtime::poll`](crate::Runtime::poll).
#[derive(Debug, Clone)]
pub struct Invalidator {
    pub(crate) sender: Sender<ComponentId>,
}

impl Invalidator {
    /// Queues an invalidation. Returns false if the runtime is gone.
    pub fn invalidate(&self, id: ComponentId) -> bool {
        self.sender.send(id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_frames_coalesce() {
        let (mut frames, receiver) = ChannelFrames::new();
        assert!(!receiver.try_recv());
        frames.request_frame();
        frames.request_frame();
        frames.request_frame();
        assert!(receiver.try_recv());
        assert!(!receiver.try_recv(), "three requests make one frame");
    }

    #[test]
    fn frames_cross_threads() {
        let (frames, receiver) = ChannelFrames::new();
        let handle = std::thread::spawn(move || {
            let mut frames = frames;
            frames.request_frame();
        });
        assert!(receiver.recv_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
