use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use tracing_subscriber::EnvFilter;

use gaia::agent::{Agent, AgentConfig};
use gaia::config::{self, ConfigStore, Settings};
use gaia::memory::UserMemory;
use gaia::shell;
use gaia::voice::{
    AudioCapture, AudioPlayback, ConsoleSynthesizer, PLAYBACK_SAMPLE_RATE, SilenceDetector,
    rms_energy,
};

/// Gaia - desktop voice assistant
#[derive(Parser)]
#[command(name = "gaia", version, about)]
struct Cli {
    /// Go straight to terminal chat
    #[arg(long, conflicts_with = "voice")]
    terminal: bool,

    /// Go straight to the voice assistant
    #[arg(long)]
    voice: bool,

    /// Configuration file
    #[arg(long, env = "GAIA_CONFIG")]
    config: Option<PathBuf>,

    /// User memory file
    #[arg(long, env = "GAIA_MEMORY")]
    memory: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Show a live microphone level meter
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a chime on the default output
    TestSpeaker,
    /// Test TTS output (cloud, then local fallback)
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Read or change configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Forget the remembered user
    Forget,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a value by dotted key (e.g. "azure.region")
    Get { key: String },
    /// Set a value; JSON literals are parsed, anything else is stored as a string
    Set { key: String, value: String },
}

/// Front ends offered by the menu
const FRONT_ENDS: [&str; 3] = ["Voice assistant", "Terminal chat", "Exit"];

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,gaia=info",
        1 => "info,gaia=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config::config_file_path);
    let memory_path = cli.memory.unwrap_or_else(config::memory_file_path);

    let mut store = ConfigStore::open(&config_path)
        .with_context(|| format!("failed to open config {}", config_path.display()))?;

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration),
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&Settings::from_store(&store), &text),
            Command::Config { action } => config_command(&mut store, action),
            Command::Forget => forget(&memory_path),
        };
    }

    let settings = Settings::from_store(&store);
    tracing::debug!(?settings, config = %config_path.display(), "loaded configuration");

    if cli.terminal {
        return terminal_chat(&settings, &config_path, &memory_path);
    }
    if cli.voice {
        return voice_assistant(&settings, &memory_path);
    }

    loop {
        let choice = Select::new()
            .with_prompt("Choose an interface")
            .items(&FRONT_ENDS)
            .default(0)
            .interact()?;

        let result = match choice {
            0 => voice_assistant(&settings, &memory_path),
            1 => terminal_chat(&settings, &config_path, &memory_path),
            _ => return Ok(()),
        };
        if let Err(e) = result {
            eprintln!("{} failed: {e:#}", FRONT_ENDS[choice]);
        }

        let again = Confirm::new()
            .with_prompt("Would you like to try another interface?")
            .default(false)
            .interact()?;
        if !again {
            return Ok(());
        }
    }
}

fn voice_assistant(settings: &Settings, memory_path: &std::path::Path) -> anyhow::Result<()> {
    tracing::info!(assistant = %settings.assistant.name, "starting voice assistant");

    let collaborators =
        shell::build_collaborators(settings).context("failed to initialize voice assistant")?;
    let memory = UserMemory::load(memory_path);

    let mut agent = Agent::new(
        AgentConfig::from_settings(settings),
        collaborators,
        memory,
        shell::console_sink(&settings.assistant.name),
    );

    println!(
        "{} is ready - say \"{}\"",
        settings.assistant.name, settings.assistant.wake_word
    );
    shell::run_voice_console(&mut agent)?;
    Ok(())
}

fn terminal_chat(
    settings: &Settings,
    config_path: &std::path::Path,
    memory_path: &std::path::Path,
) -> anyhow::Result<()> {
    let mut dispatcher =
        shell::build_dispatcher(settings).context("failed to initialize terminal chat")?;
    let memory = UserMemory::load(memory_path);
    let mut output = ConsoleSynthesizer::new(settings.assistant.name.clone());

    println!("{} terminal chat", settings.assistant.name);
    shell::run_terminal_chat(
        std::io::stdin().lock(),
        &mut dispatcher,
        &mut output,
        memory.user_name(),
        config_path,
    )?;
    Ok(())
}

fn config_command(store: &mut ConfigStore, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
            None => anyhow::bail!("no value for '{key}'"),
        },
        ConfigAction::Set { key, value } => {
            let parsed = serde_json::from_str(&value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            store.set(&key, parsed)?;
            println!("Set {key} in {}", store.path().display());
        }
    }
    Ok(())
}

fn forget(memory_path: &std::path::Path) -> anyhow::Result<()> {
    let mut memory = UserMemory::load(memory_path);
    match memory.user_name() {
        Some(name) => println!("Forgetting {name}"),
        None => println!("No user remembered"),
    }
    memory.clear()?;
    Ok(())
}

    /// Print one level line per second so the wake-word threshold can be judged
fn test_mic(duration: u64) -> anyhow::Result<()> {
    const WIDTH: usize = 40;

    let mut capture = AudioCapture::new()?;
    capture.start()?;
    println!(
        "Listening for {duration}s at {} Hz. Say \"Gaia\" a few times.",
        capture.sample_rate()
    );

    let mut detector = SilenceDetector::new(capture.sample_rate());
    for second in 1..=duration {
        std::thread::sleep(Duration::from_secs(1));
        let chunk = capture.take_buffer();
        let level = rms_energy(&chunk);
        detector.process(&chunk);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filled = ((level * 80.0) as usize).min(WIDTH);
        let marker = if detector.heard_speech() { "speech" } else { "quiet" };
        println!(
            "{second:>3}s |{}{}| {level:.4} {marker}",
            "#".repeat(filled),
            ".".repeat(WIDTH - filled)
        );
    }
    capture.stop();

    if detector.heard_speech() {
        println!("Microphone OK: speech crossed the detection threshold.");
    } else {
        println!("No speech detected. Check the input device (audio.input_device) and its gain.");
    }
    Ok(())
}

/// Play a short two-note chime on the default output
fn test_speaker() -> anyhow::Result<()> {
    let playback = AudioPlayback::new()?;

    #[allow(clippy::cast_precision_loss)]
    let rate = PLAYBACK_SAMPLE_RATE as f32;
    let note = |frequency: f32| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let len = (rate * 0.6) as usize;
        (0..len).map(move |n| {
            #[allow(clippy::cast_precision_loss)]
            let t = n as f32 / rate;
            0.25 * (std::f32::consts::TAU * frequency * t).sin()
        })
    };
    let chime: Vec<f32> = note(660.0).chain(note(880.0)).collect();

    println!("Playing a chime at {PLAYBACK_SAMPLE_RATE} Hz...");
    playback.play(chime)?;
    println!("Done. If nothing was audible, check the default output device and its volume.");
    Ok(())
}

/// Test TTS through the cloud engine with local fallback
fn test_tts(settings: &Settings, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let mut speech = shell::build_speech(settings)?;
    let outcome = speech.speak(text);
    speech.release();

    for failure in &outcome.failures {
        println!("{} engine '{}' failed: {}", failure.tier, failure.engine, failure.error);
    }
    if !outcome.delivered {
        anyhow::bail!("no speech engine could speak the text");
    }

    let tier = if outcome.fallback_used { "local fallback" } else { "Azure" };
    println!("Spoken with the {tier} engine");
    Ok(())
}
