//! Double-buffered PCM window shared between the audio thread and the render thread
//!
//! The audio thread assembles a complete window in its own working copy and
//! publishes it into the back slot, then flips the front index. The render
//! thread only ever copies out of the front slot, so a reader never sees a
//! half-written window.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, ShellError};

/// Samples per channel in one PCM window
pub const PCM_WINDOW: usize = 512;

/// One fixed window of de-interleaved 16-bit samples, `[channel][frame]`
pub type Pcm16Block = [[i16; PCM_WINDOW]; 2];

const I16_SCALE: f32 = 32768.0;

/// A complete window of samples in the canonical representation
/// (normalized f32, one array per channel)
#[derive(Clone, Debug, PartialEq)]
pub struct PcmWindow {
    pub left: [f32; PCM_WINDOW],
    pub right: [f32; PCM_WINDOW],
    /// Channel count of the source that produced this window
    pub channels: u16,
    /// Publish counter, 0 for a window that was never written
    pub sequence: u64,
}

impl PcmWindow {
    /// An all-zero window
    pub fn silent() -> Self {
        Self {
            left: [0.0; PCM_WINDOW],
            right: [0.0; PCM_WINDOW],
            channels: 2,
            sequence: 0,
        }
    }

    /// RMS level of each channel
    pub fn rms(&self) -> (f32, f32) {
        (rms(&self.left), rms(&self.right))
    }

    /// Convert back to 16-bit samples
    pub fn to_pcm16(&self) -> Pcm16Block {
        let mut block = [[0i16; PCM_WINDOW]; 2];
        for i in 0..PCM_WINDOW {
            block[0][i] = (self.left[i] * I16_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            block[1][i] = (self.right[i] * I16_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
        block
    }
}

impl Default for PcmWindow {
    fn default() -> Self {
        Self::silent()
    }
}

fn rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Double buffer holding the latest complete window
pub struct PcmBuffer {
    slots: [Mutex<PcmWindow>; 2],
    front: AtomicUsize,
    sequence: AtomicU64,
    dropped: AtomicU64,
}

/// Thread-safe handle to a PCM buffer
pub type SharedPcm = Arc<PcmBuffer>;

impl PcmBuffer {
    pub fn new() -> Self {
        Self {
            slots: [Mutex::new(PcmWindow::silent()), Mutex::new(PcmWindow::silent())],
            front: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Create a new shared buffer
    pub fn shared() -> SharedPcm {
        Arc::new(Self::new())
    }

    /// Publish a complete window (writer side)
    ///
    /// Never blocks: if the reader still holds the back slot the window is
    /// dropped and counted, the next callback will publish a newer one.
    pub fn publish(&self, window: &PcmWindow) -> bool {
        let back = 1 - self.front.load(Ordering::Acquire);
        match self.slots[back].try_lock() {
            Some(mut slot) => {
                slot.left = window.left;
                slot.right = window.right;
                slot.channels = window.channels;
                slot.sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
                drop(slot);
                self.front.store(back, Ordering::Release);
                true
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Copy the latest complete window into `out` (reader side)
    pub fn read_into(&self, out: &mut PcmWindow) {
        let front = self.front.load(Ordering::Acquire);
        let slot = self.slots[front].lock();
        out.left = slot.left;
        out.right = slot.right;
        out.channels = slot.channels;
        out.sequence = slot.sequence;
    }

    /// Get a copy of the latest complete window
    pub fn latest(&self) -> PcmWindow {
        let mut window = PcmWindow::silent();
        self.read_into(&mut window);
        window
    }

    /// Number of windows published so far
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Windows dropped because the reader held the back slot
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Create a writer feeding this buffer
    pub fn writer(self: &Arc<Self>) -> PcmWriter {
        PcmWriter::new(self.clone())
    }
}

impl Default for PcmBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer-side working buffer
///
/// Keeps a sliding window over the most recent frames so variable-sized
/// capture callbacks always publish a full window.
pub struct PcmWriter {
    buffer: SharedPcm,
    working: PcmWindow,
}

impl PcmWriter {
    fn new(buffer: SharedPcm) -> Self {
        Self {
            buffer,
            working: PcmWindow::silent(),
        }
    }

    /// Add interleaved float samples, mono or stereo, unmodified
    pub fn add_f32(&mut self, samples: &[f32], channels: u16) -> Result<()> {
        let channels = match channels {
            1 | 2 => channels as usize,
            other => return Err(ShellError::UnsupportedChannelLayout(other)),
        };

        let frames = samples.len() / channels;
        if frames == 0 {
            return Ok(());
        }

        // Only the newest PCM_WINDOW frames can survive
        let skip = frames.saturating_sub(PCM_WINDOW);
        let take = frames - skip;

        self.working.left.copy_within(take.., 0);
        self.working.right.copy_within(take.., 0);

        let tail = PCM_WINDOW - take;
        for i in 0..take {
            let base = (skip + i) * channels;
            let left = samples[base];
            let right = if channels == 2 { samples[base + 1] } else { left };
            self.working.left[tail + i] = left;
            self.working.right[tail + i] = right;
        }

        self.working.channels = channels as u16;
        self.buffer.publish(&self.working);
        Ok(())
    }

    /// Add one fixed window of de-interleaved 16-bit samples
    pub fn add_pcm16(&mut self, block: &Pcm16Block) {
        for i in 0..PCM_WINDOW {
            self.working.left[i] = block[0][i] as f32 / I16_SCALE;
            self.working.right[i] = block[1][i] as f32 / I16_SCALE;
        }
        self.working.channels = 2;
        self.buffer.publish(&self.working);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn publish_replaces_whole_window() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();

        let samples: Vec<f32> = (0..PCM_WINDOW * 2).map(|i| i as f32 / 2048.0).collect();
        writer.add_f32(&samples, 2).unwrap();

        let window = buffer.latest();
        assert_eq!(window.sequence, 1);
        assert_eq!(window.channels, 2);
        assert_abs_diff_eq!(window.left[0], 0.0);
        assert_abs_diff_eq!(window.right[0], 1.0 / 2048.0);
        assert_abs_diff_eq!(window.left[PCM_WINDOW - 1], ((PCM_WINDOW - 1) * 2) as f32 / 2048.0);
    }

    #[test]
    fn short_chunks_slide_into_the_tail() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();

        writer.add_f32(&[0.25; 8], 1).unwrap();
        writer.add_f32(&[0.5; 4], 1).unwrap();

        let window = buffer.latest();
        assert_eq!(window.sequence, 2);
        assert_abs_diff_eq!(window.left[PCM_WINDOW - 1], 0.5);
        assert_abs_diff_eq!(window.left[PCM_WINDOW - 5], 0.25);
        assert_abs_diff_eq!(window.left[PCM_WINDOW - 13], 0.0);
        // mono is mirrored into both channels
        assert_eq!(window.left, window.right);
    }

    #[test]
    fn oversized_chunk_keeps_newest_frames() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();

        let samples: Vec<f32> = (0..PCM_WINDOW + 100).map(|i| i as f32).collect();
        writer.add_f32(&samples, 1).unwrap();

        let window = buffer.latest();
        assert_abs_diff_eq!(window.left[0], 100.0);
        assert_abs_diff_eq!(window.left[PCM_WINDOW - 1], (PCM_WINDOW + 99) as f32);
    }

    #[test]
    fn float_ingest_rejects_multichannel() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();
        let err = writer.add_f32(&[0.0; 12], 6).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(buffer.sequence(), 0);
    }

    #[test]
    fn pcm16_round_trips_exactly() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();

        let mut block = [[0i16; PCM_WINDOW]; 2];
        for i in 0..PCM_WINDOW {
            block[0][i] = (i as i16) * 64 - 16384;
            block[1][i] = i16::MIN + i as i16;
        }
        writer.add_pcm16(&block);

        assert_eq!(buffer.latest().to_pcm16(), block);
    }

    #[test]
    fn publish_is_dropped_while_reader_holds_back_slot() {
        let buffer = PcmBuffer::new();
        let window = PcmWindow::silent();

        // front is slot 0, so the writer targets slot 1
        let guard = buffer.slots[1].lock();
        assert!(!buffer.publish(&window));
        drop(guard);

        assert_eq!(buffer.dropped(), 1);
        assert!(buffer.publish(&window));
        assert_eq!(buffer.sequence(), 1);
    }

    #[test]
    fn concurrent_reader_never_sees_torn_window() {
        let buffer = PcmBuffer::shared();
        let mut writer = buffer.writer();

        let producer = std::thread::spawn(move || {
            for n in 1..=2000u32 {
                let value = n as f32;
                writer.add_f32(&[value; PCM_WINDOW], 1).unwrap();
            }
        });

        let mut window = PcmWindow::silent();
        for _ in 0..2000 {
            buffer.read_into(&mut window);
            let first = window.left[0];
            assert!(window.left.iter().all(|&s| s == first));
        }

        producer.join().unwrap();
    }
}
