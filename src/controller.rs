//! Conversation controller
//!
//! Drives each user through the reminder setup dialogue:
//!
//! ```text
//! /start -> AwaitingTime --valid HH:MM--> AwaitingMessage --text--> (scheduled, session cleared)
//!               ^   |
//!               +---+ invalid time, re-prompt
//! ```

use crate::replies;
use crate::scheduler::{ReminderSink, ScheduledReminder};
use crate::session::{ConversationState, SessionStore, UserId};
use crate::time_of_day::TimeOfDay;
use chrono::Local;
use tracing::{debug, error, info};

/// An inbound event from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start { user: UserId, display_name: String },
    Text { user: UserId, text: String },
}

pub struct ConversationController<S> {
    sessions: SessionStore,
    sink: S,
}

impl<S: ReminderSink> ConversationController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sessions: SessionStore::new(),
            sink,
        }
    }

    /// Process one event and return the reply for the originating user
    pub fn handle(&mut self, inbound: Inbound) -> String {
        match inbound {
            Inbound::Start { user, display_name } => self.start(user, &display_name),
            Inbound::Text { user, text } => self.text(user, &text),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn start(&mut self, user: UserId, display_name: &str) -> String {
        let session = self.sessions.start(user, display_name);
        info!(
            "user_id={} user_full_name={} time={}",
            user,
            session.display_name,
            Local::now().format("%a %b %e %H:%M:%S %Y")
        );
        replies::greeting(&session.display_name)
    }

    fn text(&mut self, user: UserId, text: &str) -> String {
        let Some(session) = self.sessions.get_mut(user) else {
            debug!("Message from {} without an active session", user);
            return replies::no_session();
        };

        match session.state {
            ConversationState::AwaitingTime => match text.parse::<TimeOfDay>() {
                Ok(time) => {
                    session.state = ConversationState::AwaitingMessage { time };
                    debug!("User {} picked {}", user, time);
                    replies::time_accepted(time)
                }
                Err(e) => {
                    debug!("User {} sent bad time: {}", user, e);
                    replies::invalid_time()
                }
            },
            ConversationState::AwaitingMessage { time } => {
                let text = text.trim();
                if text.is_empty() {
                    return replies::empty_text();
                }
                self.complete(user, time, text)
            }
        }
    }

    fn complete(&mut self, user: UserId, time: TimeOfDay, text: &str) -> String {
        let display_name = self
            .sessions
            .finish(user)
            .map(|session| session.display_name)
            .unwrap_or_default();

        let reminder = ScheduledReminder {
            target: user,
            time,
            text: text.to_string(),
        };

        match self.sink.schedule(reminder) {
            Ok(()) => {
                info!(
                    "Reminder for {} set at {} with text: {}",
                    display_name, time, text
                );
                replies::reminder_set(time, text)
            }
            Err(e) => {
                error!("Failed to schedule reminder for {}: {}", user, e);
                replies::schedule_failed()
            }
        }
    }
}
