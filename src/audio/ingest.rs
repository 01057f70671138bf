//! Capture callback ingest: decode raw device bytes into the PCM buffer

use crate::audio::pcm::{Pcm16Block, PcmWriter, SharedPcm, PCM_WINDOW};
use crate::audio::{AudioFormat, SampleFormat};
use crate::error::{Result, ShellError};
use crossbeam_channel::Sender;
use tracing::{error, trace};

/// Where a capture stream delivers its samples
///
/// Cheap to clone; backends turn it into a [`CaptureSink`] once the
/// negotiated format is known.
#[derive(Clone)]
pub struct IngestTarget {
    pcm: SharedPcm,
    fatal_tx: Sender<ShellError>,
}

impl IngestTarget {
    pub fn new(pcm: SharedPcm, fatal_tx: Sender<ShellError>) -> Self {
        Self { pcm, fatal_tx }
    }

    /// Build the sink for a stream with the given negotiated format
    pub fn sink(&self, format: AudioFormat) -> CaptureSink {
        CaptureSink {
            writer: self.pcm.writer(),
            format,
            scratch: Vec::with_capacity(PCM_WINDOW * 2),
            fatal_tx: self.fatal_tx.clone(),
            failed: false,
        }
    }
}

/// Per-stream ingest state owned by the audio callback
pub struct CaptureSink {
    writer: PcmWriter,
    format: AudioFormat,
    scratch: Vec<f32>,
    fatal_tx: Sender<ShellError>,
    failed: bool,
}

impl CaptureSink {
    /// Entry point for the platform callback
    ///
    /// The callback has no way to return an error, so a fatal one is sent
    /// to the main loop and the sink goes quiet.
    pub fn on_bytes(&mut self, bytes: &[u8]) {
        if self.failed {
            return;
        }
        if let Err(e) = self.consume(bytes) {
            error!("Audio ingest failed: {}", e);
            self.failed = true;
            let _ = self.fatal_tx.try_send(e);
        }
    }

    /// Decode one callback's worth of bytes and publish it
    pub fn consume(&mut self, bytes: &[u8]) -> Result<()> {
        trace!("Ingest {} bytes ({})", bytes.len(), self.format);
        match self.format.sample_format {
            SampleFormat::F32 => {
                self.scratch.clear();
                self.scratch.extend(
                    bytes
                        .chunks_exact(4)
                        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
                );
                self.writer.add_f32(&self.scratch, self.format.channels)
            }
            SampleFormat::I16 => {
                let block = deinterleave_s16(bytes, self.format.channels)?;
                self.writer.add_pcm16(&block);
                Ok(())
            }
        }
    }
}

/// Split native-endian interleaved 16-bit bytes into one window per channel
///
/// Mono is copied to both channels. Short input is zero padded, anything
/// beyond one window is ignored.
pub fn deinterleave_s16(bytes: &[u8], channels: u16) -> Result<Pcm16Block> {
    let channels = match channels {
        1 | 2 => channels as usize,
        other => return Err(ShellError::UnsupportedChannelLayout(other)),
    };

    let mut block = [[0i16; PCM_WINDOW]; 2];
    let samples = bytes.len() / 2;
    let frames = (samples / channels).min(PCM_WINDOW);

    let sample_at = |index: usize| i16::from_ne_bytes([bytes[index * 2], bytes[index * 2 + 1]]);

    for frame in 0..frames {
        for ch in 0..2 {
            let src = if channels == 1 { 0 } else { ch };
            block[ch][frame] = sample_at(frame * channels + src);
        }
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmBuffer;
    use approx::assert_abs_diff_eq;
    use crossbeam_channel::unbounded;

    fn interleave(left: &[i16], right: &[i16]) -> Vec<u8> {
        left.iter()
            .zip(right)
            .flat_map(|(l, r)| {
                let mut frame = l.to_ne_bytes().to_vec();
                frame.extend_from_slice(&r.to_ne_bytes());
                frame
            })
            .collect()
    }

    #[test]
    fn full_stereo_window_preserves_values() {
        let left: Vec<i16> = (0..PCM_WINDOW as i16).map(|i| i * 3).collect();
        let right: Vec<i16> = (0..PCM_WINDOW as i16).map(|i| -i * 7).collect();
        let bytes = interleave(&left, &right);

        let block = deinterleave_s16(&bytes, 2).unwrap();
        assert_eq!(&block[0][..], &left[..]);
        assert_eq!(&block[1][..], &right[..]);
    }

    #[test]
    fn mono_is_copied_to_both_channels() {
        let samples: Vec<u8> = (0..PCM_WINDOW as i16)
            .flat_map(|i| (i - 256).to_ne_bytes())
            .collect();
        let block = deinterleave_s16(&samples, 1).unwrap();
        assert_eq!(block[0], block[1]);
        assert_eq!(block[0][0], -256);
        assert_eq!(block[0][PCM_WINDOW - 1], 255);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let bytes = interleave(&[100, 200], &[-100, -200]);
        let block = deinterleave_s16(&bytes, 2).unwrap();
        assert_eq!(block[0][..3], [100, 200, 0]);
        assert_eq!(block[1][..3], [-100, -200, 0]);
        assert!(block[0][2..].iter().all(|&s| s == 0));
    }

    #[test]
    fn surround_layout_is_rejected() {
        let err = deinterleave_s16(&[0u8; 64], 6).unwrap_err();
        assert!(matches!(err, ShellError::UnsupportedChannelLayout(6)));
    }

    #[test]
    fn float_bytes_reach_the_buffer_unmodified() {
        let pcm = PcmBuffer::shared();
        let (tx, _rx) = unbounded();
        let target = IngestTarget::new(pcm.clone(), tx);
        let mut sink = target.sink(AudioFormat::preferred());

        let bytes: Vec<u8> = [0.5f32, -0.25]
            .iter()
            .cycle()
            .take(PCM_WINDOW * 2)
            .flat_map(|s| s.to_ne_bytes())
            .collect();
        sink.on_bytes(&bytes);

        let window = pcm.latest();
        assert_abs_diff_eq!(window.left[10], 0.5);
        assert_abs_diff_eq!(window.right[10], -0.25);
    }

    #[test]
    fn fatal_layout_is_reported_once() {
        let pcm = PcmBuffer::shared();
        let (tx, rx) = unbounded();
        let target = IngestTarget::new(pcm.clone(), tx);
        let mut sink = target.sink(AudioFormat {
            sample_rate: 48_000,
            channels: 4,
            sample_format: SampleFormat::I16,
        });

        sink.on_bytes(&[0u8; 128]);
        sink.on_bytes(&[0u8; 128]);

        let errors: Vec<_> = rx.try_iter().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_fatal());
        assert_eq!(pcm.sequence(), 0);
    }
}
