//! Voice activity detection
//!
//! Decides when a spoken utterance has ended using local RMS energy:
//! speech must last long enough, then be followed by a stretch of silence.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech, in milliseconds
const MIN_SPEECH_MS: u32 = 300;

/// Silence duration that ends an utterance, in milliseconds
const SILENCE_MS: u32 = 500;

/// State of the silence detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    /// No speech yet
    Idle,
    /// Speech detected, accumulating
    Speaking,
    /// Enough speech followed by enough silence
    Complete,
}

/// Detects the end of an utterance in a stream of audio chunks
#[derive(Debug)]
pub struct SilenceDetector {
    state: VadState,
    threshold: f32,
    min_speech_samples: usize,
    silence_samples: usize,
    speech_counter: usize,
    silence_counter: usize,
}

impl SilenceDetector {
    /// Create a detector for audio at `sample_rate`
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            state: VadState::Idle,
            threshold: ENERGY_THRESHOLD,
            min_speech_samples: samples_for_ms(sample_rate, MIN_SPEECH_MS),
            silence_samples: samples_for_ms(sample_rate, SILENCE_MS),
            speech_counter: 0,
            silence_counter: 0,
        }
    }

    /// Override the energy threshold
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Feed a chunk of samples
    ///
    /// Returns true once the utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return self.is_complete();
        }

        let energy = rms_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            VadState::Idle => {
                if is_speech {
                    self.state = VadState::Speaking;
                    self.speech_counter = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            VadState::Speaking => {
                if is_speech {
                    self.speech_counter += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    speech = self.speech_counter,
                    silence = self.silence_counter,
                    energy,
                    "speaking state"
                );

                if self.silence_counter >= self.silence_samples {
                    if self.speech_counter >= self.min_speech_samples {
                        tracing::debug!(samples = self.speech_counter, "utterance complete");
                        self.state = VadState::Complete;
                    } else {
                        // Too short to be speech, probably a click
                        self.reset();
                    }
                }
            }
            VadState::Complete => {}
        }

        self.is_complete()
    }

    /// Whether an utterance has ended
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == VadState::Complete
    }

    /// Whether any speech has been heard
    #[must_use]
    pub fn heard_speech(&self) -> bool {
        self.state != VadState::Idle
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> VadState {
        self.state
    }

    /// Reset detector to idle state
    pub const fn reset(&mut self) {
        self.state = VadState::Idle;
        self.speech_counter = 0;
        self.silence_counter = 0;
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn samples_for_ms(sample_rate: u32, ms: u32) -> usize {
    (sample_rate as u64 * ms as u64 / 1000) as usize
}

/// Calculate RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
