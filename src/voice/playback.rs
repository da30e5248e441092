//! Audio playback to speakers

use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches the Azure 24kHz MP3 output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Extra wait beyond the clip length before giving up on playback
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Plays audio to the default output device
///
/// Only the negotiated stream config is kept; the device is reopened for
/// each clip so the player can live on any thread.
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(PLAYBACK_SAMPLE_RATE);
        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play mono samples at [`PLAYBACK_SAMPLE_RATE`], blocking until the clip ends
    ///
    /// The wait is bounded by the clip length plus a short grace period, so
    /// a stalled device cannot hang the agent loop.
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available or the stream fails
    pub fn play(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("output device went away".to_string()))?;

        let channels = usize::from(self.config.channels);
        let clip_len = samples.len();
        let (done_tx, done_rx) = mpsc::channel();
        let mut cursor = samples.into_iter();
        let mut done_tx = Some(done_tx);

        let stream = device
            .build_output_stream(
                &self.config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in out.chunks_mut(channels) {
                        let value = cursor.next().unwrap_or_else(|| {
                            if let Some(tx) = done_tx.take() {
                                let _ = tx.send(());
                            }
                            0.0
                        });
                        frame.fill(value);
                    }
                },
                |err| tracing::error!(error = %err, "audio playback error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let clip = Duration::from_millis(clip_len as u64 * 1000 / u64::from(PLAYBACK_SAMPLE_RATE));
        if done_rx.recv_timeout(clip + DRAIN_GRACE).is_err() {
            tracing::warn!(samples = clip_len, "playback did not finish in time");
        }
        // Let the device drain its last buffer before the stream is dropped
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = clip_len, "playback complete");
        Ok(())
    }

    /// Play audio from MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play(samples)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the stream is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
