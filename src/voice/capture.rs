//! Audio capture from microphone

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::vad::SilenceDetector;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often the recorder drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a recording is terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePolicy {
    /// Record for exactly this long
    Fixed(Duration),
    /// Record until speech is followed by silence, or `max` elapses
    UntilSilence {
        /// Hard upper bound
        max: Duration,
    },
}

/// Records microphone audio to a WAV file
pub trait Recorder: Send {
    /// Record according to `policy` and return the path of the WAV file
    ///
    /// # Errors
    ///
    /// Returns error if the microphone is unavailable or the file cannot be written
    fn record(&mut self, policy: CapturePolicy) -> Result<PathBuf>;

    /// Release any held audio resources
    ///
    /// # Errors
    ///
    /// Returns error if cleanup fails
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Captures audio from an input device
///
/// Holds a live `cpal` stream, so it stays on the thread that created it.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device at [`SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        Self::open(None, SAMPLE_RATE)
    }

    /// Open an input device by name (or the default) at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if no device or no suitable config is available
    pub fn open(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let named = device_name.and_then(|wanted| {
            let found = host
                .input_devices()
                .ok()?
                .find(|d| d.name().is_ok_and(|n| n == wanted));
            if found.is_none() {
                tracing::warn!(device = wanted, "input device not found, using default");
            }
            found
        });

        let device = match named {
            Some(device) => device,
            None => host
                .default_input_device()
                .ok_or_else(|| Error::Audio("no input device available".to_string()))?,
        };

        let rate = SampleRate(sample_rate);
        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let channels = usize::from(self.config.channels.max(1));

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        if channels == 1 {
                            buf.extend_from_slice(data);
                        } else {
                            // Downmix interleaved frames to mono
                            #[allow(clippy::cast_precision_loss)]
                            buf.extend(
                                data.chunks(channels)
                                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                            );
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured audio buffer and clear it
    ///
    /// Returns the audio samples captured since last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

/// Microphone recorder that writes each capture to a WAV file
///
/// The input stream is opened per recording, so the recorder itself holds
/// no device handles and can move to the agent's worker thread.
#[derive(Debug, Clone)]
pub struct MicRecorder {
    device_name: Option<String>,
    sample_rate: u32,
    output_path: PathBuf,
}

impl MicRecorder {
    /// Create a recorder writing to `<temp dir>/gaia-input.wav`
    #[must_use]
    pub fn new(device_name: Option<String>, sample_rate: u32) -> Self {
        Self {
            device_name,
            sample_rate,
            output_path: std::env::temp_dir().join("gaia-input.wav"),
        }
    }

    fn capture(&self, policy: CapturePolicy) -> Result<Vec<f32>> {
        let mut capture = AudioCapture::open(self.device_name.as_deref(), self.sample_rate)?;
        capture.start()?;

        let samples = match policy {
            CapturePolicy::Fixed(duration) => {
                std::thread::sleep(duration);
                capture.take_buffer()
            }
            CapturePolicy::UntilSilence { max } => {
                let mut detector = SilenceDetector::new(self.sample_rate);
                let started = Instant::now();
                let mut collected = Vec::new();

                loop {
                    std::thread::sleep(POLL_INTERVAL);
                    let chunk = capture.take_buffer();
                    collected.extend_from_slice(&chunk);

                    if detector.process(&chunk) {
                        break;
                    }
                    if started.elapsed() >= max {
                        tracing::debug!(
                            heard_speech = detector.heard_speech(),
                            "capture reached max duration"
                        );
                        break;
                    }
                }
                collected
            }
        };

        capture.stop();
        Ok(samples)
    }
}

impl Recorder for MicRecorder {
    fn record(&mut self, policy: CapturePolicy) -> Result<PathBuf> {
        let samples = self.capture(policy)?;
        tracing::debug!(samples = samples.len(), ?policy, "recording finished");

        write_wav_file(&self.output_path, &samples, self.sample_rate)?;
        Ok(self.output_path.clone())
    }

    fn release(&mut self) -> Result<()> {
        if self.output_path.exists() {
            std::fs::remove_file(&self.output_path)?;
        }
        tracing::debug!("recorder released");
        Ok(())
    }
}

/// Write f32 samples to a 16-bit mono WAV file
///
/// # Errors
///
/// Returns error if the file cannot be created or encoding fails
pub fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    encode_wav(file, samples, sample_rate)
}

fn encode_wav<W: std::io::Write + std::io::Seek>(
    sink: W,
    samples: &[f32],
    sample_rate: u32,
) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(sink, spec).map_err(|e| Error::Audio(e.to_string()))?;

    for &sample in samples {
        // Convert f32 [-1.0, 1.0] to i16
        #[allow(clippy::cast_possible_truncation)]
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }

    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(())
}
