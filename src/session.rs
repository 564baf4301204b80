use tracing::{debug, error, info, warn};

use crate::conversation::{Conversation, Turn};
use crate::error::ChatError;

pub const APOLOGY: &str = "I'm sorry, but I encountered an error. Please try again later.";

/// One step of a streamed reply, in transport order.
#[derive(Debug)]
pub enum StreamUpdate {
    Chunk(String),
    Finished,
    Failed(ChatError),
}

/// Conversation plus the send-in-flight guard.
///
/// All mutation goes through `begin_submit` and `apply`, which run to
/// completion without suspending, so observers never see a half-applied
/// update.
#[derive(Debug)]
pub struct ChatSession {
    conversation: Conversation,
    in_flight: bool,
}

impl ChatSession {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(greeting),
            in_flight: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Start a send from the input buffer.
    ///
    /// Returns the request payload (full history including the new user
    /// turn, without the empty reply placeholder), or `None` with nothing
    /// changed when the buffer is blank or a send is already running.
    pub fn begin_submit(&mut self, buffer: &mut String) -> Option<Vec<Turn>> {
        if buffer.trim().is_empty() || self.in_flight {
            return None;
        }

        self.in_flight = true;
        let text = std::mem::take(buffer);
        info!(chars = text.chars().count(), "submitting message");

        self.conversation.push_exchange(text);
        Some(self.conversation.history())
    }

    pub fn apply(&mut self, update: StreamUpdate) {
        if !self.in_flight {
            warn!(?update, "stream update with no send in flight, ignoring");
            return;
        }

        match update {
            StreamUpdate::Chunk(text) => {
                debug!(bytes = text.len(), "folding chunk");
                self.conversation.append_to_open(&text);
            }
            StreamUpdate::Finished => {
                info!(
                    chars = self.conversation.last().content.chars().count(),
                    "reply complete"
                );
                self.in_flight = false;
            }
            StreamUpdate::Failed(err) => {
                error!(error = %err, "reply failed");
                self.conversation.overwrite_open(APOLOGY);
                self.in_flight = false;
            }
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(crate::conversation::GREETING)
    }
}
