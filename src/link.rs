//! The link primitive the stack sends and receives raw Ethernet frames through

use std::collections::VecDeque;

/// Errors reported by a [`Link`]
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The underlying device failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The received frame does not fit in the receive buffer
    #[error("frame of {size} bytes exceeds the {capacity} byte receive buffer")]
    Oversized {
        /// The size of the frame
        size: usize,
        /// The size of the receive buffer
        capacity: usize,
    },
    /// The link has been shut down
    #[error("link is closed")]
    Closed,
}

/// A device that can send and receive complete Ethernet frames
pub trait Link {
    /// Transmits a complete frame, header included
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Copies the next pending frame, if any, into `buf`, returning its length
    ///
    /// This must never block, `Ok(None)` means nothing is pending.
    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, LinkError>;
}

impl<L: Link + ?Sized> Link for &mut L {
    #[inline]
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        (**self).send(frame)
    }

    #[inline]
    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, LinkError> {
        (**self).receive(buf)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    #[inline]
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        (**self).send(frame)
    }

    #[inline]
    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, LinkError> {
        (**self).receive(buf)
    }
}

/// An in-memory [`Link`]
///
/// Frames queued with [`Self::inject`] are handed out by [`Link::receive`] in
/// order, and every frame passed to [`Link::send`] is recorded until taken with
/// [`Self::take_sent`].
#[derive(Debug, Default)]
pub struct MemoryLink {
    rx: VecDeque<Vec<u8>>,
    tx: Vec<Vec<u8>>,
}

impl MemoryLink {
    /// Queues a frame to be received
    #[inline]
    pub fn inject(&mut self, frame: impl Into<Vec<u8>>) {
        self.rx.push_back(frame.into());
    }

    /// The number of frames waiting to be received
    #[inline]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// The frames sent so far
    #[inline]
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.tx
    }

    /// Takes every frame sent so far
    #[inline]
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.tx)
    }
}

impl Link for MemoryLink {
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.tx.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, LinkError> {
        let Some(frame) = self.rx.pop_front() else {
            return Ok(None);
        };

        if frame.len() > buf.len() {
            return Err(LinkError::Oversized {
                size: frame.len(),
                capacity: buf.len(),
            });
        }

        buf[..frame.len()].copy_from_slice(&frame);
        Ok(Some(frame.len()))
    }
}
