//! WASAPI loopback capture of the system's mixed output

use crate::audio::backend::CaptureStream;
use crate::audio::ingest::IngestTarget;
use crate::audio::{AudioFormat, SampleFormat};
use crate::error::{Result, ShellError};
use crossbeam_channel::bounded;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use windows::Win32::{
    Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0},
    Media::Audio::{
        eConsole, eRender, IAudioCaptureClient, IAudioClient, IMMDeviceEnumerator,
        MMDeviceEnumerator, AUDCLNT_BUFFERFLAGS_SILENT, AUDCLNT_SHAREMODE_SHARED,
        AUDCLNT_STREAMFLAGS_EVENTCALLBACK, AUDCLNT_STREAMFLAGS_LOOPBACK,
    },
    System::{
        Com::{CoCreateInstance, CoInitializeEx, CoTaskMemFree, CLSCTX_ALL, COINIT_MULTITHREADED},
        Threading::{CreateEventW, WaitForSingleObject},
    },
};

/// Loopback capture on the default render endpoint
pub struct LoopbackCapture {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    format: AudioFormat,
    block_align: usize,
    event: HANDLE,
    started: bool,
}

impl LoopbackCapture {
    /// Open the default render device in loopback mode
    ///
    /// COM is initialized for the calling thread, so create this on the
    /// thread that will read from it.
    pub fn from_default_device() -> Result<Self> {
        unsafe {
            let _ = CoInitializeEx(None, COINIT_MULTITHREADED);

            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
            let device = enumerator.GetDefaultAudioEndpoint(eRender, eConsole)?;
            let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None)?;

            let format_ptr = audio_client.GetMixFormat()?;
            let mix = &*format_ptr;
            let sample_format = match mix.wBitsPerSample {
                32 => Some(SampleFormat::F32),
                16 => Some(SampleFormat::I16),
                _ => None,
            };
            let channels = mix.nChannels;
            let sample_rate = mix.nSamplesPerSec;
            let block_align = mix.nBlockAlign as usize;

            let Some(sample_format) = sample_format else {
                let bits = mix.wBitsPerSample;
                CoTaskMemFree(Some(format_ptr as *const _));
                return Err(ShellError::LoopbackUnavailable(format!(
                    "unsupported mix format ({} bits)",
                    bits
                )));
            };

            let event = CreateEventW(None, false, false, None)?;

            // 50ms in 100-nanosecond units
            let buffer_duration = 500_000i64;
            let init = audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_EVENTCALLBACK,
                buffer_duration,
                0,
                format_ptr,
                None,
            );
            CoTaskMemFree(Some(format_ptr as *const _));
            init?;

            audio_client.SetEventHandle(event)?;
            let capture_client: IAudioCaptureClient = audio_client.GetService()?;

            let format = AudioFormat {
                sample_rate,
                channels,
                sample_format,
            };
            debug!("Loopback mix format: {}", format);

            Ok(Self {
                audio_client,
                capture_client,
                format,
                block_align,
                event,
                started: false,
            })
        }
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        unsafe { self.audio_client.Start()? };
        self.started = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        unsafe { self.audio_client.Stop()? };
        self.started = false;
        Ok(())
    }

    /// Wait for the next packet and hand its bytes to `deliver`
    ///
    /// Silent packets are delivered as zeros. Returns the frame count,
    /// 0 on timeout.
    pub fn read_packet(
        &self,
        timeout_ms: u32,
        scratch: &mut Vec<u8>,
        mut deliver: impl FnMut(&[u8]),
    ) -> Result<u32> {
        unsafe {
            if WaitForSingleObject(self.event, timeout_ms) != WAIT_OBJECT_0 {
                return Ok(0);
            }

            let mut data_ptr: *mut u8 = ptr::null_mut();
            let mut num_frames: u32 = 0;
            let mut flags: u32 = 0;
            self.capture_client
                .GetBuffer(&mut data_ptr, &mut num_frames, &mut flags, None, None)?;

            if num_frames == 0 {
                return Ok(0);
            }

            let byte_count = num_frames as usize * self.block_align;
            let silent = (flags & AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0;
            trace!("Loopback packet: {} frames, silent={}", num_frames, silent);

            if silent {
                scratch.clear();
                scratch.resize(byte_count, 0);
                deliver(scratch.as_slice());
            } else {
                deliver(std::slice::from_raw_parts(data_ptr, byte_count));
            }

            self.capture_client.ReleaseBuffer(num_frames)?;
            Ok(num_frames)
        }
    }
}

impl Drop for LoopbackCapture {
    fn drop(&mut self) {
        let _ = self.stop();
        unsafe {
            if !self.event.is_invalid() {
                let _ = CloseHandle(self.event);
            }
        }
    }
}

/// Loopback capture running on its own thread
pub struct LoopbackStream {
    format: AudioFormat,
    paused: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LoopbackStream {
    /// Open loopback capture; the stream starts paused
    pub fn open(target: IngestTarget) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<AudioFormat>>(1);
        let paused = Arc::new(AtomicBool::new(true));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let thread_paused = paused.clone();
        let thread_stop = stop_flag.clone();
        let handle = thread::Builder::new()
            .name("capture-loopback".to_string())
            .spawn(move || loopback_thread(target, ready_tx, thread_paused, thread_stop))?;

        let format = match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                stop_flag.store(true, Ordering::SeqCst);
                return Err(ShellError::LoopbackUnavailable(
                    "timed out opening the render endpoint".to_string(),
                ));
            }
        };

        info!("Opened loopback capture ({})", format);

        Ok(Self {
            format,
            paused,
            stop_flag,
            handle: Some(handle),
        })
    }
}

impl CaptureStream for LoopbackStream {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("Closed loopback capture");
        }
    }

    fn is_running(&self) -> bool {
        self.handle.is_some() && !self.paused.load(Ordering::Relaxed)
    }
}

impl Drop for LoopbackStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Loopback thread function
fn loopback_thread(
    target: IngestTarget,
    ready_tx: crossbeam_channel::Sender<Result<AudioFormat>>,
    paused: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
) {
    let mut capture = match LoopbackCapture::from_default_device() {
        Ok(capture) => capture,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let format = capture.format().clone();
    if let Err(e) = format.check_channels() {
        let _ = ready_tx.send(Err(e));
        return;
    }
    if let Err(e) = capture.start() {
        let _ = ready_tx.send(Err(e));
        return;
    }
    let _ = ready_tx.send(Ok(format.clone()));

    let mut sink = target.sink(format);
    let mut scratch = Vec::new();

    while !stop_flag.load(Ordering::Relaxed) {
        // Packets are still drained while paused so the endpoint does not overflow
        let deliver = !paused.load(Ordering::Relaxed);
        let result = capture.read_packet(100, &mut scratch, |bytes| {
            if deliver {
                sink.on_bytes(bytes);
            }
        });
        if let Err(e) = result {
            warn!("Loopback capture error: {}", e);
            thread::sleep(Duration::from_millis(10));
        }
    }

    let _ = capture.stop();
    debug!("Loopback thread stopped");
}
