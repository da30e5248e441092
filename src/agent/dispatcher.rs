//! Routes utterances to built-in commands or the language model

use crate::automation::Automation;
use crate::interpreter;
use crate::llm::LanguageModel;

/// Spoken when a command or the language model fails
pub const APOLOGY: &str = "Sorry, I encountered an error processing your request.";

/// Turns an utterance into the replies to speak
pub struct CommandDispatcher {
    automation: Box<dyn Automation>,
    llm: Box<dyn LanguageModel>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(automation: Box<dyn Automation>, llm: Box<dyn LanguageModel>) -> Self {
        Self { automation, llm }
    }

    /// Replies for `utterance`, in speaking order
    ///
    /// Built-in commands win; anything else is sent to the language model.
    /// Failures are logged and answered with [`APOLOGY`].
    pub fn handle(&mut self, utterance: &str, user_name: Option<&str>) -> Vec<String> {
        match interpreter::interpret(utterance, self.automation.as_ref()) {
            Ok(Some(result)) => result.into_utterances(),
            Ok(None) => {
                let prompt = format!(
                    "{} said: {utterance}. Provide a helpful response.",
                    user_name.unwrap_or("there")
                );
                match self.llm.ask(&prompt) {
                    Ok(reply) => vec![reply],
                    Err(e) => {
                        tracing::error!(error = %e, "language model request failed");
                        vec![APOLOGY.to_string()]
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, utterance, "command failed");
                vec![APOLOGY.to_string()]
            }
        }
    }
}
