//! Per-user conversation sessions
//!
//! A session exists only while a user is walking through the reminder setup
//! dialogue. No session means the user has not sent `/start` yet, or has
//! already finished.

use crate::time_of_day::TimeOfDay;
use std::collections::HashMap;
use std::fmt;

/// Greeting name used when the transport gives us nothing
pub const DEFAULT_DISPLAY_NAME: &str = "друг";

/// Transport-level user identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingTime,
    AwaitingMessage { time: TimeOfDay },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub user_id: UserId,
    pub display_name: String,
    pub state: ConversationState,
}

impl ConversationSession {
    pub fn new(user_id: UserId, display_name: &str) -> Self {
        let display_name = display_name.trim();
        let display_name = if display_name.is_empty() {
            DEFAULT_DISPLAY_NAME
        } else {
            display_name
        };

        Self {
            user_id,
            display_name: display_name.to_string(),
            state: ConversationState::AwaitingTime,
        }
    }

    /// Time collected so far, if the time step is done
    pub fn time(&self) -> Option<TimeOfDay> {
        match self.state {
            ConversationState::AwaitingTime => None,
            ConversationState::AwaitingMessage { time } => Some(time),
        }
    }
}

/// In-memory map of user -> active session, owned by the controller
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, ConversationSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session, replacing whatever the user had
    pub fn start(&mut self, user_id: UserId, display_name: &str) -> &ConversationSession {
        let session = ConversationSession::new(user_id, display_name);
        self.sessions.insert(user_id, session);
        &self.sessions[&user_id]
    }

    pub fn get(&self, user_id: UserId) -> Option<&ConversationSession> {
        self.sessions.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Option<&mut ConversationSession> {
        self.sessions.get_mut(&user_id)
    }

    /// Drop the session once the dialogue is over
    pub fn finish(&mut self, user_id: UserId) -> Option<ConversationSession> {
        self.sessions.remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
