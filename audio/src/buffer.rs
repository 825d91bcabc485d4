use crate::types::AudioChunk;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a non-blocking pop.
#[derive(Debug)]
pub enum TryPop {
    Chunk(AudioChunk),
    /// Nothing queued right now.
    Empty,
    /// The end-of-stream sentinel has been reached.
    Closed,
}

/// Unbounded FIFO between the capture callback thread and the consumer.
///
/// `None` is the end-of-stream sentinel. Once the consumer has seen it, every
/// later pop reports end-of-stream again, so any number of readers created
/// over the same buffer terminate cleanly.
#[derive(Clone)]
pub struct AudioBuffer {
    sender: Sender<Option<AudioChunk>>,
    receiver: Receiver<Option<AudioChunk>>,
    closed: Arc<AtomicBool>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a chunk, or the sentinel when `item` is `None`.
    pub fn push(&self, item: Option<AudioChunk>) {
        // Cannot fail: this buffer always holds a receiver.
        let _ = self.sender.send(item);
    }

    /// Queue the end-of-stream sentinel.
    pub fn close(&self) {
        self.push(None);
    }

    /// Block until a chunk is available. `None` means end-of-stream.
    pub fn pop_blocking(&self) -> Option<AudioChunk> {
        if self.is_closed() {
            return None;
        }
        match self.receiver.recv() {
            Ok(Some(chunk)) => Some(chunk),
            Ok(None) | Err(_) => {
                self.mark_closed();
                None
            }
        }
    }

    pub fn try_pop(&self) -> TryPop {
        if self.is_closed() {
            return TryPop::Closed;
        }
        match self.receiver.try_recv() {
            Ok(Some(chunk)) => TryPop::Chunk(chunk),
            Ok(None) | Err(TryRecvError::Disconnected) => {
                self.mark_closed();
                TryPop::Closed
            }
            Err(TryRecvError::Empty) => TryPop::Empty,
        }
    }

    /// Whether the consumer has already observed the sentinel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of queued items, sentinel included.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
        log::debug!("🔚 Audio buffer reached end-of-stream");
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new()
    }
}
