use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hi! I'm the support assistant. How can I help you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation, serialized as `{"role", "content"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered list of turns. Never empty; the last turn is the only one that
/// is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(greeting)],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn last(&self) -> &Turn {
        // Seeded with the greeting and only ever grows.
        &self.turns[self.turns.len() - 1]
    }

    /// Append the user turn and its (empty) assistant reply in one step.
    pub fn push_exchange(&mut self, user_text: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(String::new()));
    }

    /// Fold a decoded chunk into the trailing assistant turn.
    ///
    /// The last turn is read fresh on every call and replaced by an extended
    /// copy; all earlier turns are left as they are. Returns `false` without
    /// touching anything when the last turn is not an assistant turn.
    pub fn append_to_open(&mut self, chunk: &str) -> bool {
        let Some(last) = self.turns.pop() else {
            return false;
        };
        if last.role != Role::Assistant {
            self.turns.push(last);
            return false;
        }

        let mut content = last.content;
        content.push_str(chunk);
        self.turns.push(Turn {
            role: last.role,
            content,
        });
        true
    }

    /// Replace the trailing assistant turn's content outright.
    pub fn overwrite_open(&mut self, text: &str) -> bool {
        match self.turns.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.content = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// The request payload: every turn except a trailing empty assistant
    /// placeholder.
    pub fn history(&self) -> Vec<Turn> {
        let placeholder = self.turns.len() > 1
            && self
                .turns
                .last()
                .is_some_and(|last| last.role == Role::Assistant && last.content.is_empty());
        let end = if placeholder { self.turns.len() - 1 } else { self.turns.len() };
        self.turns[..end].to_vec()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(GREETING)
    }
}
