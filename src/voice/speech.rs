//! Tiered speech output
//!
//! Each utterance goes to the primary (cloud) synthesizer first and to the
//! fallback (local) synthesizer only if the primary failed. A tier is tried at
//! most once per utterance; when both fail the utterance is dropped.

use std::fmt;

use super::tts::Synthesizer;

/// Which synthesizer tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Cloud engine
    Primary,
    /// Local engine
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A single failed synthesis attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: Tier,
    pub engine: String,
    pub error: String,
}

/// Result of speaking one utterance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakOutcome {
    /// Some tier spoke the text
    pub delivered: bool,
    /// The fallback tier was the one that spoke
    pub fallback_used: bool,
    /// One entry per tier that failed
    pub failures: Vec<TierFailure>,
}

impl SpeakOutcome {
    /// Nothing was attempted (empty text)
    #[must_use]
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Primary plus fallback synthesizer
#[derive(Default)]
pub struct SpeechOutput {
    primary: Option<Box<dyn Synthesizer>>,
    fallback: Option<Box<dyn Synthesizer>>,
}

impl SpeechOutput {
    /// Create an output with the given tiers
    #[must_use]
    pub fn new(
        primary: Option<Box<dyn Synthesizer>>,
        fallback: Option<Box<dyn Synthesizer>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Output with a single synthesizer and no fallback
    #[must_use]
    pub fn single(synth: Box<dyn Synthesizer>) -> Self {
        Self::new(Some(synth), None)
    }

    /// Whether any tier is configured
    #[must_use]
    pub const fn has_engine(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    /// Speak `text` through the first tier that succeeds
    ///
    /// Never fails: every error is recorded in the returned outcome.
    pub fn speak(&mut self, text: &str) -> SpeakOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SpeakOutcome::skipped();
        }

        tracing::info!(text, "speaking");
        let mut outcome = SpeakOutcome::default();

        let tiers = [
            (Tier::Primary, self.primary.as_mut()),
            (Tier::Fallback, self.fallback.as_mut()),
        ];
        for (tier, synth) in tiers {
            let Some(synth) = synth else { continue };
            match synth.speak(text) {
                Ok(()) => {
                    outcome.delivered = true;
                    outcome.fallback_used = tier == Tier::Fallback;
                    break;
                }
                Err(e) => {
                    tracing::warn!(%tier, engine = synth.name(), error = %e, "speech synthesis failed");
                    outcome.failures.push(TierFailure {
                        tier,
                        engine: synth.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !outcome.delivered {
            tracing::error!(text, "all speech engines failed, utterance dropped");
        }
        outcome
    }

    /// Release both tiers, logging each failure independently
    pub fn release(&mut self) {
        for synth in [self.primary.as_mut(), self.fallback.as_mut()].into_iter().flatten() {
            if let Err(e) = synth.release() {
                tracing::warn!(engine = synth.name(), error = %e, "failed to release synthesizer");
            }
        }
    }
}

impl fmt::Debug for SpeechOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechOutput")
            .field("primary", &self.primary.as_ref().map(|s| s.name()))
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{Error, Result};

    struct Scripted {
        name: &'static str,
        fail: bool,
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl Synthesizer for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn speak(&mut self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(Error::Tts(format!("{} down", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn synth(name: &'static str, fail: bool) -> (Box<dyn Synthesizer>, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let s = Scripted {
            name,
            fail,
            spoken: Arc::clone(&spoken),
        };
        (Box::new(s), spoken)
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let (primary, p) = synth("cloud", false);
        let (fallback, f) = synth("local", false);
        let mut out = SpeechOutput::new(Some(primary), Some(fallback));

        let outcome = out.speak("Hello");
        assert!(outcome.delivered);
        assert!(!outcome.fallback_used);
        assert!(outcome.failures.is_empty());
        assert_eq!(p.lock().unwrap().as_slice(), ["Hello"]);
        assert!(f.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fallback_after_primary_failure() {
        let (primary, p) = synth("cloud", true);
        let (fallback, f) = synth("local", false);
        let mut out = SpeechOutput::new(Some(primary), Some(fallback));

        let outcome = out.speak("Hello");
        assert!(outcome.delivered);
        assert!(outcome.fallback_used);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].tier, Tier::Primary);
        assert_eq!(p.lock().unwrap().len(), 1);
        assert_eq!(f.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_both_fail_each_tried_once() {
        let (primary, p) = synth("cloud", true);
        let (fallback, f) = synth("local", true);
        let mut out = SpeechOutput::new(Some(primary), Some(fallback));

        let outcome = out.speak("Hello");
        assert!(!outcome.delivered);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[1].engine, "local");
        assert_eq!(p.lock().unwrap().len(), 1);
        assert_eq!(f.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_text_is_skipped() {
        let (primary, p) = synth("cloud", false);
        let mut out = SpeechOutput::single(primary);

        assert_eq!(out.speak("   "), SpeakOutcome::skipped());
        assert!(p.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_engines_drops_utterance() {
        let mut out = SpeechOutput::default();
        assert!(!out.has_engine());
        let outcome = out.speak("Hello");
        assert!(!outcome.delivered);
        assert!(outcome.failures.is_empty());
    }
}
