//! Buffering between the audio callback and the capture task.
//!
//! Two layers:
//!
//! - [`ChunkReader`] wraps the lock-free SPSC ring the device callback pushes
//!   into, and cuts the raw sample stream into fixed-size [`AudioChunk`]s.
//! - [`SampleBuffer`] accumulates those chunks for the lifetime of a capture
//!   session, bounded by a maximum-duration policy. It is consumed exactly
//!   once at capture end to materialize the persisted take.

use ringbuf::traits::{Consumer, Observer};
use std::time::Duration;

use crate::AudioChunk;

/// Outcome of pushing a chunk into a [`SampleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The chunk was appended.
    Stored,
    /// The buffer was at capacity; the chunk was dropped (drop-newest).
    Dropped,
}

/// Bounded, append-only store of captured audio chunks.
///
/// The bound is a chunk count derived from a maximum-duration policy. Once
/// at capacity, further pushes are dropped rather than overwriting earlier
/// audio; the caller is expected to report the overflow condition once.
#[derive(Debug)]
pub struct SampleBuffer {
    chunks: Vec<AudioChunk>,
    max_chunks: usize,
}

impl SampleBuffer {
    /// Creates a buffer bounded to `max_chunks` chunks.
    pub fn with_max_chunks(max_chunks: usize) -> Self {
        Self {
            chunks: Vec::new(),
            max_chunks,
        }
    }

    /// Creates a buffer sized for `max_duration` of audio at the given chunk
    /// duration.
    ///
    /// The bound rounds up so a partial trailing chunk still fits.
    pub fn for_duration(max_duration: Duration, chunk_duration: Duration) -> Self {
        let max_chunks = if chunk_duration.is_zero() {
            0
        } else {
            (max_duration.as_secs_f64() / chunk_duration.as_secs_f64()).ceil() as usize
        };
        Self::with_max_chunks(max_chunks)
    }

    /// Appends a chunk, unless the buffer is at capacity.
    pub fn push(&mut self, chunk: AudioChunk) -> PushOutcome {
        if self.chunks.len() >= self.max_chunks {
            return PushOutcome::Dropped;
        }
        self.chunks.push(chunk);
        PushOutcome::Stored
    }

    /// Returns the number of buffered chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunks are buffered.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns `true` if the next push would be dropped.
    pub fn is_full(&self) -> bool {
        self.chunks.len() >= self.max_chunks
    }

    /// Total buffered frames across all chunks.
    pub fn frames(&self) -> usize {
        self.chunks.iter().map(AudioChunk::frame_count).sum()
    }

    /// Total buffered duration.
    pub fn duration(&self) -> Duration {
        self.chunks.iter().map(AudioChunk::duration).sum()
    }

    /// Concatenates all buffered chunks into one interleaved sample array.
    ///
    /// Consumes the buffer; a session calls this exactly once, on the
    /// persist path.
    pub fn concat(self) -> Vec<f32> {
        let total: usize = self.chunks.iter().map(|c| c.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in &self.chunks {
            samples.extend_from_slice(&chunk.samples);
        }
        samples
    }
}

/// Cuts the capture ring buffer's sample stream into fixed-size chunks.
///
/// The device callback is the single producer; the capture task is the
/// single consumer. Chunk ordering is append-only and preserved.
pub(crate) struct ChunkReader {
    consumer: ringbuf::HeapCons<f32>,
    sample_rate: u32,
    channels: u16,
    chunk_size: usize,
    samples_read: u64,
}

impl ChunkReader {
    /// Creates a reader producing `chunk_frames`-sized chunks.
    pub fn new(
        consumer: ringbuf::HeapCons<f32>,
        sample_rate: u32,
        channels: u16,
        chunk_frames: u32,
    ) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            chunk_size: chunk_frames as usize * channels as usize,
            samples_read: 0,
        }
    }

    /// Returns `true` if enough samples are available for a complete chunk.
    pub fn has_chunk(&self) -> bool {
        self.consumer.occupied_len() >= self.chunk_size
    }

    /// Attempts to read a complete chunk from the ring.
    ///
    /// Returns `None` if not enough samples are available.
    pub fn try_read_chunk(&mut self) -> Option<AudioChunk> {
        if !self.has_chunk() {
            return None;
        }

        let mut samples = Vec::with_capacity(self.chunk_size);
        for _ in 0..self.chunk_size {
            match self.consumer.try_pop() {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }

        if samples.is_empty() {
            return None;
        }

        Some(self.finish_chunk(samples))
    }

    /// Drains all remaining samples from the ring.
    ///
    /// Returns chunks until the ring is empty. The last chunk may be smaller
    /// than the configured chunk size.
    pub fn drain(&mut self) -> Vec<AudioChunk> {
        let mut chunks = Vec::new();

        while self.has_chunk() {
            if let Some(chunk) = self.try_read_chunk() {
                chunks.push(chunk);
            }
        }

        let remaining = self.consumer.occupied_len();
        if remaining > 0 {
            let mut samples = Vec::with_capacity(remaining);
            while let Some(sample) = self.consumer.try_pop() {
                samples.push(sample);
            }
            if !samples.is_empty() {
                chunks.push(self.finish_chunk(samples));
            }
        }

        chunks
    }

    fn finish_chunk(&mut self, samples: Vec<f32>) -> AudioChunk {
        let timestamp = Duration::from_secs_f64(
            self.samples_read as f64 / f64::from(self.sample_rate) / f64::from(self.channels),
        );
        self.samples_read += samples.len() as u64;
        AudioChunk::new(samples, timestamp, self.sample_rate, self.channels)
    }
}
