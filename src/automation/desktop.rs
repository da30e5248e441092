//! Desktop automation: launching programs and writing Office files

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::Automation;
use super::office;
use crate::config::{AutomationSettings, EmailSettings};
use crate::{Error, Result};

/// Names that refer to the word processor
const WORD_ALIASES: &[&str] = &["word", "winword.exe"];

/// Word processor launch candidates, tried in order
#[cfg(target_os = "windows")]
const WORD_CANDIDATES: &[&str] = &["winword.exe", "winword", "microsoft word"];
#[cfg(target_os = "macos")]
const WORD_CANDIDATES: &[&str] = &["Microsoft Word", "Pages"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const WORD_CANDIDATES: &[&str] = &["lowriter", "libreoffice", "abiword"];

/// Launches local programs and creates documents on this machine
pub struct DesktopAutomation {
    settings: AutomationSettings,
    #[cfg(feature = "email")]
    inbox: Option<super::inbox::ImapInbox>,
}

impl DesktopAutomation {
    /// Create desktop automation from settings
    ///
    /// An incomplete email configuration only disables inbox access.
    #[must_use]
    pub fn new(settings: AutomationSettings, email: &EmailSettings) -> Self {
        #[cfg(feature = "email")]
        let inbox = match super::inbox::ImapInbox::new(email) {
            Ok(inbox) => Some(inbox),
            Err(e) => {
                tracing::debug!(error = %e, "inbox access disabled");
                None
            }
        };
        #[cfg(not(feature = "email"))]
        let _ = email;

        Self {
            settings,
            #[cfg(feature = "email")]
            inbox,
        }
    }

    /// Resolve a relative path against the output directory
    fn output_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.output_dir.join(path)
        }
    }

    fn open_word_processor() -> String {
        for candidate in WORD_CANDIDATES {
            match launch(candidate) {
                Ok(()) => return "Microsoft Word opened successfully".to_string(),
                Err(e) => tracing::debug!(candidate, error = %e, "word processor candidate failed"),
            }
        }
        "Could not open Microsoft Word. Please make sure it's installed.".to_string()
    }
}

impl Automation for DesktopAutomation {
    fn open_application(&self, name: &str) -> String {
        let name = name.trim();
        if WORD_ALIASES.contains(&name.to_lowercase().as_str()) {
            return Self::open_word_processor();
        }

        match launch(name) {
            Ok(()) => {
                tracing::info!(app = name, "application opened");
                format!("Opened {name}")
            }
            Err(e) => {
                tracing::warn!(app = name, error = %e, "failed to open application");
                format!("Error opening {name}: {e}")
            }
        }
    }

    fn create_spreadsheet(&self, path: &Path) -> Result<String> {
        let path = self.output_path(path);
        office::write_workbook(&path, &["Hello", "World"])?;
        Ok(format!("Excel file created at {}", path.display()))
    }

    fn create_document(&self, path: &Path, text: &str) -> Result<String> {
        let path = self.output_path(path);
        office::write_document(&path, text)?;
        Ok(format!("Word document created at {}", path.display()))
    }

    #[cfg(feature = "email")]
    fn list_inbox(&self, limit: usize) -> Result<Vec<String>> {
        self.inbox
            .as_ref()
            .ok_or_else(|| Error::Config("email is not configured".to_string()))?
            .recent(limit)
    }

    #[cfg(not(feature = "email"))]
    fn list_inbox(&self, _limit: usize) -> Result<Vec<String>> {
        Err(Error::Config("built without email support".to_string()))
    }

    fn mail_client(&self) -> &str {
        &self.settings.mail_client
    }

    fn text_editor(&self) -> &str {
        &self.settings.text_editor
    }
}

/// Start a program without waiting for it to exit
///
/// Executables on `PATH` are spawned directly; anything else goes through the
/// platform opener.
fn launch(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Automation("no program name given".to_string()));
    }

    if let Ok(program) = which::which(name) {
        Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        return Ok(());
    }

    let status = opener(name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Automation(format!("{name} could not be found ({status})")))
    }
}

#[cfg(target_os = "windows")]
fn opener(name: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", name]);
    cmd
}

#[cfg(target_os = "macos")]
fn opener(name: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.args(["-a", name]);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener(name: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(name);
    cmd
}
