//! Text-to-speech (TTS) engines

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use secrecy::{ExposeSecret, SecretString};

use super::playback::AudioPlayback;
use crate::{Error, Result};

/// Speaks text aloud
pub trait Synthesizer: Send {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Speak `text`, blocking until playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Release engine resources
    ///
    /// # Errors
    ///
    /// Returns error if cleanup fails
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Azure output format requested from the REST API
const AZURE_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Cloud synthesis through the Azure Speech REST API
pub struct AzureSynthesizer {
    client: reqwest::blocking::Client,
    key: SecretString,
    endpoint: String,
    voice: String,
    playback: Option<AudioPlayback>,
}

impl AzureSynthesizer {
    /// Create a new Azure synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the subscription key or region is missing
    pub fn new(key: Option<SecretString>, region: &str, voice: String) -> Result<Self> {
        let key = key
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| Error::Config("Azure speech key required for TTS".to_string()))?;
        if region.trim().is_empty() {
            return Err(Error::Config("Azure speech region required".to_string()));
        }

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            key,
            endpoint: format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                region.trim()
            ),
            voice,
            playback: None,
        })
    }

    /// Fetch synthesized MP3 audio for `text`
    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let ssml = build_ssml(&self.voice, text);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", self.key.expose_secret())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", AZURE_OUTPUT_FORMAT)
            .header("User-Agent", "gaia")
            .body(ssml)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Tts(format!("Azure TTS error {status}: {body}")));
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl Synthesizer for AzureSynthesizer {
    fn name(&self) -> &str {
        "azure"
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let audio = self.synthesize(text)?;
        tracing::debug!(bytes = audio.len(), voice = %self.voice, "azure synthesis complete");

        if self.playback.is_none() {
            self.playback = Some(AudioPlayback::new()?);
        }
        match &self.playback {
            Some(playback) => playback.play_mp3(&audio),
            None => Err(Error::Audio("no playback device".to_string())),
        }
    }

    fn release(&mut self) -> Result<()> {
        self.playback = None;
        Ok(())
    }
}

/// Build the SSML document for one utterance
fn build_ssml(voice: &str, text: &str) -> String {
    let lang = voice.splitn(3, '-').take(2).collect::<Vec<_>>().join("-");
    let lang = if lang.len() == 5 { lang } else { "en-US".to_string() };
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice name='{}'>{}</voice></speak>",
        escape_xml(voice),
        escape_xml(text)
    )
}

/// Escape XML special characters
#[must_use]
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Platform speech command used by [`LocalSynthesizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalEngine {
    Espeak,
    SpeechDispatcher,
    Say,
    PowerShell,
}

/// Offline synthesis through the platform speech command
pub struct LocalSynthesizer {
    engine: LocalEngine,
    program: PathBuf,
    rate: u32,
    volume: f32,
}

impl LocalSynthesizer {
    /// Locate a speech command on this machine
    ///
    /// # Errors
    ///
    /// Returns error if no supported speech command is installed
    pub fn new(rate: u32, volume: f32) -> Result<Self> {
        let candidates: &[(&str, LocalEngine)] = if cfg!(target_os = "windows") {
            &[("powershell", LocalEngine::PowerShell)]
        } else if cfg!(target_os = "macos") {
            &[("say", LocalEngine::Say)]
        } else {
            &[
                ("espeak-ng", LocalEngine::Espeak),
                ("espeak", LocalEngine::Espeak),
                ("spd-say", LocalEngine::SpeechDispatcher),
            ]
        };

        let (program, engine) = candidates
            .iter()
            .find_map(|(name, engine)| which::which(name).ok().map(|p| (p, *engine)))
            .ok_or_else(|| Error::Config("no local speech engine found".to_string()))?;

        tracing::debug!(program = %program.display(), ?engine, rate, "local TTS initialized");

        Ok(Self {
            engine,
            program,
            rate,
            volume: volume.clamp(0.0, 1.0),
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        // Leading dashes would be parsed as options
        let text = text.trim_start_matches('-');
        match self.engine {
            LocalEngine::Espeak => {
                let amplitude = (self.volume * 100.0).round() as u32;
                cmd.args(["-s", &self.rate.to_string(), "-a", &amplitude.to_string(), text]);
            }
            LocalEngine::SpeechDispatcher => {
                let rate = ((i64::from(self.rate) - 180) / 2).clamp(-100, 100);
                cmd.args(["-w", "-r", &rate.to_string(), text]);
            }
            LocalEngine::Say => {
                cmd.args(["-r", &self.rate.to_string(), text]);
            }
            LocalEngine::PowerShell => {
                let rate = ((i64::from(self.rate) - 180) / 20).clamp(-10, 10);
                let volume = (self.volume * 100.0).round() as u32;
                let script = format!(
                    "Add-Type -AssemblyName System.Speech; \
                     $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                     $s.Rate = {rate}; $s.Volume = {volume}; \
                     $s.Speak([Console]::In.ReadToEnd())"
                );
                cmd.args(["-NoProfile", "-Command", &script]);
            }
        }
        cmd
    }
}

impl Synthesizer for LocalSynthesizer {
    fn name(&self) -> &str {
        "local"
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let mut cmd = self.command(text);
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());

        let output = if self.engine == LocalEngine::PowerShell {
            let mut child = cmd.stdin(Stdio::piped()).spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes())?;
            }
            child.wait_with_output()?
        } else {
            cmd.stdin(Stdio::null()).output()?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Tts(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Prints utterances instead of speaking them (terminal chat)
pub struct ConsoleSynthesizer {
    speaker: String,
}

impl ConsoleSynthesizer {
    /// Create a console synthesizer that prefixes lines with `speaker`
    #[must_use]
    pub fn new(speaker: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
        }
    }
}

impl Synthesizer for ConsoleSynthesizer {
    fn name(&self) -> &str {
        "console"
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}: {text}", self.speaker)?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
        assert_eq!(escape_xml("it's \"fine\""), "it&apos;s &quot;fine&quot;");
    }

    #[test]
    fn test_ssml_uses_voice_locale() {
        let ssml = build_ssml("en-GB-SoniaNeural", "Hello");
        assert!(ssml.contains("xml:lang='en-GB'"));
        assert!(ssml.contains("<voice name='en-GB-SoniaNeural'>Hello</voice>"));

        let ssml = build_ssml("custom", "Hi");
        assert!(ssml.contains("xml:lang='en-US'"));
    }

    #[test]
    fn test_azure_requires_key() {
        assert!(AzureSynthesizer::new(None, "eastus", "en-US-AriaNeural".to_string()).is_err());
        assert!(
            AzureSynthesizer::new(
                Some(SecretString::from(" ".to_string())),
                "eastus",
                "en-US-AriaNeural".to_string()
            )
            .is_err()
        );
        assert!(
            AzureSynthesizer::new(
                Some(SecretString::from("key".to_string())),
                "",
                "en-US-AriaNeural".to_string()
            )
            .is_err()
        );
    }
}
