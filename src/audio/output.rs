//! Real audio output using CPAL (Cross-Platform Audio Library).

use crate::audio::mixer::Mixer;
use crate::defaults;
use crate::error::{CloneCtlError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List all available audio output devices.
///
/// # Errors
/// Returns `CloneCtlError::AudioOutput` if device enumeration fails.
pub fn list_output_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.output_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| CloneCtlError::AudioOutput {
        message: format!("Failed to enumerate output devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            device_names.push(name);
        }
    }

    Ok(device_names)
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: We ensure that the stream is only accessed from a single thread at
/// a time; the stream methods are called synchronously from the owning
/// AudioOutput and never cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// The playback context: a cpal output stream feeding from a shared `Mixer`.
///
/// One `AudioOutput` is exclusively owned by the active session's driver; the
/// mixer handle is the only state shared with the audio callback thread.
pub struct AudioOutput {
    device: cpal::Device,
    stream: Option<SendableStream>,
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Create a playback context on the given device (or the system default).
    ///
    /// The mixer runs at the device's default output rate so decoded chunks
    /// are resampled exactly once, on decode.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host
                    .output_devices()
                    .map_err(|e| CloneCtlError::AudioOutput {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| CloneCtlError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                host.default_output_device()
                    .ok_or_else(|| CloneCtlError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    })
            }
        })?;

        let (sample_rate, channels) = match device.default_output_config() {
            Ok(config) => (config.sample_rate(), config.channels()),
            Err(_) => (defaults::FALLBACK_SAMPLE_RATE, 2),
        };

        Ok(Self {
            device,
            stream: None,
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate))),
            sample_rate,
            channels,
        })
    }

    /// Shared handle to the mixer (the playback clock).
    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Ensure the output stream exists and is playing.
    ///
    /// A suspended or not-yet-built stream must be running before anything is
    /// scheduled, otherwise the clock does not advance.
    pub fn resume(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = self.build_stream()?;
            self.stream = Some(SendableStream(stream));
        }
        if let Some(ref stream) = self.stream {
            stream.0.play().map_err(|e| CloneCtlError::AudioOutput {
                message: format!("Failed to start audio stream: {}", e),
            })?;
        }
        Ok(())
    }

    /// Tear down the stream and rewind the playback clock to zero.
    ///
    /// Guarantees that a following session starts from a clean clock,
    /// independent of anything scheduled before.
    pub fn close(&mut self) {
        self.stream = None;
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.reset();
        }
    }

    /// Wait until every scheduled clip has been rendered.
    pub async fn drain(&self) {
        loop {
            let idle = self.mixer.lock().map(|m| m.is_idle()).unwrap_or(true);
            if idle {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(defaults::DRAIN_POLL_MS)).await;
        }
    }

    /// Build the f32 output stream, interleaving the mono mix across the
    /// device's channels.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        let mixer = Arc::clone(&self.mixer);
        let channels = self.channels as usize;
        let mut mono = Vec::new();

        self.device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);
                    match mixer.lock() {
                        Ok(mut mixer) => mixer.render(&mut mono),
                        Err(_) => mono.fill(0.0),
                    }
                    for (frame, &sample) in mono.iter().enumerate() {
                        for ch in 0..channels {
                            data[frame * channels + ch] = sample;
                        }
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| CloneCtlError::AudioOutput {
                message: format!("Failed to build output stream: {}", e),
            })
    }
}
