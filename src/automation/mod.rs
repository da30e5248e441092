//! Office automation collaborators
//!
//! Opening applications, creating Office documents and reading the inbox.

mod desktop;
#[cfg(feature = "email")]
mod inbox;
mod office;

use std::path::Path;

pub use desktop::DesktopAutomation;
#[cfg(feature = "email")]
pub use inbox::{ImapInbox, summarize_header};
pub use office::{write_document, write_workbook};

/// Actions the command interpreter can perform on the desktop
pub trait Automation: Send {
    /// Open a program by name and describe the result
    ///
    /// Launch failures are reported in the returned message.
    fn open_application(&self, name: &str) -> String;

    /// Create a spreadsheet at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    fn create_spreadsheet(&self, path: &Path) -> crate::Result<String>;

    /// Create a document at `path` containing `text`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    fn create_document(&self, path: &Path, text: &str) -> crate::Result<String>;

    /// Summaries of up to `limit` recent inbox messages
    ///
    /// # Errors
    ///
    /// Returns error if the inbox is unconfigured or unreachable
    fn list_inbox(&self, limit: usize) -> crate::Result<Vec<String>>;

    /// Program opened for email commands
    fn mail_client(&self) -> &str {
        "outlook"
    }

    /// Program opened by a bare "open"
    fn text_editor(&self) -> &str {
        crate::config::default_text_editor()
    }
}
