//! Voice processing module
//!
//! Handles audio capture, end-of-speech detection, transcription, speech
//! synthesis and playback.

mod capture;
mod playback;
mod speech;
mod stt;
mod tts;
mod vad;

pub use capture::{AudioCapture, CapturePolicy, MicRecorder, Recorder, SAMPLE_RATE, write_wav_file};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use speech::{SpeakOutcome, SpeechOutput, Tier, TierFailure};
pub use stt::{Transcriber, WhisperTranscriber};
pub use tts::{AzureSynthesizer, ConsoleSynthesizer, LocalSynthesizer, Synthesizer, escape_xml};
pub use vad::{SilenceDetector, VadState, rms_energy};
