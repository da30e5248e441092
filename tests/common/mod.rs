//! Shared test utilities
//!
//! Scripted collaborators so the agent can be driven without audio hardware,
//! network access or a language model.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gaia::agent::{AgentConfig, AgentEvent, Collaborators, EventSink, Runner};
use gaia::automation::Automation;
use gaia::llm::LanguageModel;
use gaia::memory::UserMemory;
use gaia::voice::{CapturePolicy, Recorder, SpeechOutput, Synthesizer, Transcriber};
use gaia::{Agent, Error, Result};

pub type Log<T> = Arc<Mutex<Vec<T>>>;

fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// One scripted listening turn
#[derive(Debug, Clone)]
pub enum Heard {
    /// The transcriber returns this text
    Text(&'static str),
    /// The recorder fails
    Fail,
}

/// Pops the next scripted turn; fails once the script runs out
pub struct ScriptedRecorder {
    script: Arc<Mutex<VecDeque<Heard>>>,
    pending: Arc<Mutex<Option<String>>>,
    policies: Log<CapturePolicy>,
}

impl Recorder for ScriptedRecorder {
    fn record(&mut self, policy: CapturePolicy) -> Result<PathBuf> {
        self.policies.lock().unwrap().push(policy);
        match self.script.lock().unwrap().pop_front() {
            Some(Heard::Text(text)) => {
                *self.pending.lock().unwrap() = Some(text.to_string());
                Ok(PathBuf::from("scripted.wav"))
            }
            Some(Heard::Fail) => Err(Error::Audio("microphone unplugged".to_string())),
            None => Err(Error::Audio("script exhausted".to_string())),
        }
    }
}

/// Returns whatever the recorder queued
pub struct ScriptedTranscriber {
    pending: Arc<Mutex<Option<String>>>,
}

impl Transcriber for ScriptedTranscriber {
    fn transcribe(&mut self, _audio_file: &Path) -> Result<String> {
        Ok(self.pending.lock().unwrap().take().unwrap_or_default())
    }
}

/// Records everything it is asked to say
pub struct RecordingSynth {
    name: &'static str,
    fail: bool,
    spoken: Log<String>,
    released: Arc<Mutex<bool>>,
}

impl RecordingSynth {
    pub fn new(name: &'static str, fail: bool) -> (Self, Log<String>) {
        let spoken = log();
        let synth = Self {
            name,
            fail,
            spoken: Arc::clone(&spoken),
            released: Arc::new(Mutex::new(false)),
        };
        (synth, spoken)
    }
}

impl Synthesizer for RecordingSynth {
    fn name(&self) -> &str {
        self.name
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            Err(Error::Tts(format!("{} unavailable", self.name)))
        } else {
            Ok(())
        }
    }

    fn release(&mut self) -> Result<()> {
        *self.released.lock().unwrap() = true;
        Ok(())
    }
}

/// Canned language model
pub struct MockLlm {
    reply: Option<String>,
    prompts: Log<String>,
}

impl MockLlm {
    /// A model answering `reply`, or failing when `None`
    pub fn new(reply: Option<&str>) -> (Self, Log<String>) {
        let prompts = log();
        let llm = Self {
            reply: reply.map(ToString::to_string),
            prompts: Arc::clone(&prompts),
        };
        (llm, prompts)
    }
}

impl LanguageModel for MockLlm {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Llm("model offline".to_string()))
    }
}

/// Automation that records requests instead of touching the desktop
#[derive(Default)]
pub struct MockAutomation {
    pub opened: Log<String>,
    pub created: Log<PathBuf>,
    pub inbox: Option<Vec<String>>,
    pub fail_documents: bool,
}

impl MockAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inbox(mut self, emails: &[&str]) -> Self {
        self.inbox = Some(emails.iter().map(ToString::to_string).collect());
        self
    }
}

impl Automation for MockAutomation {
    fn open_application(&self, name: &str) -> String {
        self.opened.lock().unwrap().push(name.to_string());
        format!("Opened {name}")
    }

    fn create_spreadsheet(&self, path: &Path) -> Result<String> {
        if self.fail_documents {
            return Err(Error::Automation("disk full".to_string()));
        }
        self.created.lock().unwrap().push(path.to_path_buf());
        Ok(format!("Excel file created at {}", path.display()))
    }

    fn create_document(&self, path: &Path, _text: &str) -> Result<String> {
        if self.fail_documents {
            return Err(Error::Automation("disk full".to_string()));
        }
        self.created.lock().unwrap().push(path.to_path_buf());
        Ok(format!("Word document created at {}", path.display()))
    }

    fn list_inbox(&self, limit: usize) -> Result<Vec<String>> {
        self.inbox
            .as_ref()
            .map(|emails| emails.iter().take(limit).cloned().collect())
            .ok_or_else(|| Error::Email("inbox unreachable".to_string()))
    }
}

/// How to build a scripted agent
pub struct Setup {
    pub script: Vec<Heard>,
    pub user: Option<&'static str>,
    pub primary_fails: bool,
    pub fallback_fails: bool,
    pub llm_reply: Option<&'static str>,
    pub inbox: Option<Vec<&'static str>>,
    pub conversation_timeout: Duration,
    pub error_backoff: Duration,
    /// Reuse an existing memory file instead of a fresh one
    pub memory_path: Option<PathBuf>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            script: Vec::new(),
            user: None,
            primary_fails: false,
            fallback_fails: false,
            llm_reply: Some("Here is a helpful answer."),
            inbox: None,
            conversation_timeout: Duration::from_secs(30),
            error_backoff: Duration::ZERO,
            memory_path: None,
        }
    }
}

/// Everything a test can inspect after driving the agent
pub struct Observed {
    pub primary: Log<String>,
    pub fallback: Log<String>,
    pub prompts: Log<String>,
    pub opened: Log<String>,
    pub policies: Log<CapturePolicy>,
    pub events: Log<AgentEvent>,
    pub memory_path: PathBuf,
    _dir: tempfile::TempDir,
}

impl Observed {
    /// Everything spoken by the primary engine
    pub fn said(&self) -> Vec<String> {
        self.primary.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Log(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Agent settings with no waiting between cycles
pub fn fast_config(conversation_timeout: Duration) -> AgentConfig {
    let mut config = AgentConfig::new("Gaia");
    config.timing.pause_poll = Duration::ZERO;
    config.timing.error_backoff = Duration::ZERO;
    config.timing.conversation_timeout = conversation_timeout;
    config.timing.join_timeout = Duration::from_secs(5);
    config
}

impl Setup {
    fn parts(self) -> (AgentConfig, Collaborators, UserMemory, EventSink, Observed) {
        let dir = tempfile::tempdir().unwrap();
        let memory_path = self
            .memory_path
            .clone()
            .unwrap_or_else(|| dir.path().join("user_memory.json"));
        let mut memory = UserMemory::load(&memory_path);
        if let Some(name) = self.user {
            memory.set_user_name(name).unwrap();
        }

        let pending = Arc::new(Mutex::new(None));
        let policies = log();
        let recorder = ScriptedRecorder {
            script: Arc::new(Mutex::new(self.script.into_iter().collect())),
            pending: Arc::clone(&pending),
            policies: Arc::clone(&policies),
        };
        let transcriber = ScriptedTranscriber { pending };

        let (primary, primary_log) = RecordingSynth::new("cloud", self.primary_fails);
        let (fallback, fallback_log) = RecordingSynth::new("local", self.fallback_fails);
        let speech = SpeechOutput::new(Some(Box::new(primary)), Some(Box::new(fallback)));

        let (llm, prompts) = MockLlm::new(self.llm_reply);

        let mut automation = MockAutomation::new();
        if let Some(inbox) = &self.inbox {
            automation = automation.with_inbox(inbox);
        }
        let opened = Arc::clone(&automation.opened);

        let events: Log<AgentEvent> = log();
        let sink_events = Arc::clone(&events);
        let sink: EventSink = Arc::new(move |event: &AgentEvent| {
            sink_events.lock().unwrap().push(event.clone());
        });

        let collaborators = Collaborators {
            recorder: Box::new(recorder),
            transcriber: Box::new(transcriber),
            speech,
            automation: Box::new(automation),
            llm: Box::new(llm),
        };

        let observed = Observed {
            primary: primary_log,
            fallback: fallback_log,
            prompts,
            opened,
            policies,
            events,
            memory_path,
            _dir: dir,
        };

        let mut config = fast_config(self.conversation_timeout);
        config.timing.error_backoff = self.error_backoff;

        (
            config,
            collaborators,
            memory,
            sink,
            observed,
        )
    }

    /// A runner to be stepped by hand
    pub fn runner(self) -> (Runner, Observed) {
        let (config, collaborators, memory, sink, observed) = self.parts();
        (Runner::new(config, collaborators, memory, sink), observed)
    }

    /// A stopped agent handle
    pub fn agent(self) -> (Agent, Observed) {
        let (config, collaborators, memory, sink, observed) = self.parts();
        (Agent::new(config, collaborators, memory, sink), observed)
    }
}

/// Step `runner` `n` times
pub fn step_n(runner: &mut Runner, n: usize) {
    for _ in 0..n {
        runner.step();
    }
}
