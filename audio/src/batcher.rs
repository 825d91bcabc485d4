use crate::buffer::{AudioBuffer, TryPop};

/// Lazily drains an [`AudioBuffer`] into coalesced byte buffers.
///
/// Each `next()` blocks for the first chunk, then takes whatever else is
/// already queued without blocking and yields the concatenation. The
/// sequence ends at the sentinel; chunks drained before the sentinel in the
/// same pull are still yielded.
pub struct ChunkBatcher {
    buffer: AudioBuffer,
    finished: bool,
}

impl ChunkBatcher {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            buffer,
            finished: false,
        }
    }
}

impl Iterator for ChunkBatcher {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(first) = self.buffer.pop_blocking() else {
            self.finished = true;
            return None;
        };

        let queued_for = first.captured_at.elapsed();
        let mut data = first.data;
        let mut coalesced = 1usize;
        loop {
            match self.buffer.try_pop() {
                TryPop::Chunk(chunk) => {
                    data.extend_from_slice(&chunk.data);
                    coalesced += 1;
                }
                TryPop::Empty => break,
                TryPop::Closed => {
                    self.finished = true;
                    break;
                }
            }
        }

        log::trace!(
            "📦 Batched {} chunks ({} bytes), oldest queued for {:?}",
            coalesced,
            data.len(),
            queued_for
        );
        Some(data)
    }
}

impl std::iter::FusedIterator for ChunkBatcher {}
