//! Conversation session: life cycle of the currently selected thread.
//!
//! The session does no I/O. It hands out tickets describing the gateway work
//! a selection or a submit requires, and accepts the results back. Every
//! selection bumps a generation counter; a result whose ticket carries an
//! older generation is discarded on arrival.

pub mod state;

use tracing::{debug, warn};
use uuid::Uuid;

use parley_core::{TenantId, ThreadId};

use crate::error::ChatError;
use crate::types::{ConversationEntry, EntryKey, Message};
use state::SessionState;

/// What happened to a gateway result handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The result updated the session.
    Applied,
    /// The selection moved on (or the view closed) before it arrived.
    Discarded,
}

/// A pending thread load, tagged with the selection it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub thread_id: ThreadId,
}

/// What the caller must do after a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPlan {
    /// Nothing to fetch; the session is Ready.
    Ready,
    /// Fetch the thread and hand it to [`ConversationSession::complete_load`].
    Load(LoadTicket),
    /// The entry is already active with a send in flight; the send
    /// re-fetches it when it completes.
    InFlight,
}

/// Where a submitted message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// An already persisted thread.
    Existing(ThreadId),
    /// A placeholder: the thread must be created first.
    Create(TenantId),
}

/// A pending send, tagged with the selection it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    generation: u64,
    target: SendTarget,
    content: String,
}

impl SendTicket {
    pub fn target(&self) -> SendTarget {
        self.target
    }

    /// Trimmed message content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// What the caller must do after a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPlan {
    /// Another send is still in flight; nothing was queued.
    Suppressed,
    Send(SendTicket),
}

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub active: Option<EntryKey>,
    pub messages: Vec<Message>,
    pub draft: String,
    pub error: Option<ChatError>,
    pub sending: bool,
}

/// State of the conversation currently shown to the user.
#[derive(Debug)]
pub struct ConversationSession {
    id: Uuid,
    state: SessionState,
    generation: u64,
    active: Option<EntryKey>,
    messages: Vec<Message>,
    draft: String,
    error: Option<ChatError>,
    sending: bool,
    closed: bool,
    max_message_length: usize,
}

impl ConversationSession {
    pub fn new(max_message_length: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            generation: 0,
            active: None,
            messages: Vec::new(),
            draft: String::new(),
            error: None,
            sending: false,
            closed: false,
            max_message_length,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active(&self) -> Option<EntryKey> {
        self.active
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            active: self.active,
            messages: self.messages.clone(),
            draft: self.draft.clone(),
            error: self.error.clone(),
            sending: self.sending,
        }
    }

    // -------------------------------------------------------------------------
    // Selection and loading
    // -------------------------------------------------------------------------

    /// Make `entry` the active conversation.
    ///
    /// Placeholders and threads whose messages are already populated become
    /// Ready at once. Other persisted threads move to Loading and return a
    /// ticket for the fetch. Re-selecting the active thread keeps what is
    /// shown until the fetch answers, and leaves a pending send on it alone.
    pub fn select(&mut self, entry: &ConversationEntry) -> Result<SelectPlan, ChatError> {
        self.ensure_open()?;
        let key = entry.key().ok_or(ChatError::NoActiveEntry)?;
        let reselect = self.active == Some(key);
        if reselect && self.state == SessionState::Sending {
            debug!(session_id = %self.id, "Re-selection ignored, send in flight");
            return Ok(SelectPlan::InFlight);
        }

        self.generation += 1;
        self.active = Some(key);
        self.error = None;

        match entry.id {
            None => {
                self.messages.clear();
                self.transition(SessionState::Ready)?;
                Ok(SelectPlan::Ready)
            }
            Some(_) if !entry.messages.is_empty() => {
                self.messages = entry.messages.clone();
                self.transition(SessionState::Ready)?;
                Ok(SelectPlan::Ready)
            }
            Some(thread_id) => {
                if !reselect {
                    self.messages.clear();
                }
                self.transition(SessionState::Loading)?;
                Ok(SelectPlan::Load(LoadTicket {
                    generation: self.generation,
                    thread_id,
                }))
            }
        }
    }

    /// Start re-fetching the active thread without changing the selection.
    ///
    /// Returns `None` when there is nothing to fetch: the active entry is a
    /// placeholder, or a send is in flight and will re-fetch on its own.
    pub fn begin_refresh(&mut self) -> Result<Option<LoadTicket>, ChatError> {
        self.ensure_open()?;
        let thread_id = match self.active {
            Some(EntryKey::Thread(id)) => id,
            Some(EntryKey::Placeholder(_)) => return Ok(None),
            None => return Err(ChatError::NoActiveEntry),
        };
        if self.state == SessionState::Sending {
            return Ok(None);
        }
        self.transition(SessionState::Loading)?;
        Ok(Some(LoadTicket {
            generation: self.generation,
            thread_id,
        }))
    }

    /// Apply the result of a load.
    ///
    /// A failed load keeps the messages already shown and returns the error.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ConversationEntry, ChatError>,
    ) -> Result<Delivery, ChatError> {
        if self.closed
            || ticket.generation != self.generation
            || self.state != SessionState::Loading
        {
            warn!(
                session_id = %self.id,
                thread_id = %ticket.thread_id,
                "Discarding stale load response"
            );
            return Ok(Delivery::Discarded);
        }

        match result {
            Ok(entry) => {
                self.messages = entry.messages;
                self.error = None;
                self.transition(SessionState::Ready)?;
                Ok(Delivery::Applied)
            }
            Err(err) => {
                self.error = Some(err.clone());
                self.transition(SessionState::Error)?;
                Err(err)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Sending
    // -------------------------------------------------------------------------

    /// Submit `content` for the active conversation.
    ///
    /// The raw input is kept as the draft until the send succeeds. Empty or
    /// over-long content is rejected before any gateway work is planned, and
    /// a submit while another send is in flight is dropped.
    pub fn begin_send(&mut self, content: &str) -> Result<SendPlan, ChatError> {
        self.ensure_open()?;
        if self.sending {
            debug!(session_id = %self.id, "Send suppressed, another send is in flight");
            return Ok(SendPlan::Suppressed);
        }

        self.draft = content.to_string();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::ValidationFailure(
                "message cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(ChatError::ValidationFailure(format!(
                "message exceeds maximum length of {} characters",
                self.max_message_length
            )));
        }

        let key = self.active.ok_or(ChatError::NoActiveEntry)?;
        self.transition(SessionState::Sending)?;
        self.sending = true;
        self.error = None;

        let target = match key {
            EntryKey::Thread(id) => SendTarget::Existing(id),
            EntryKey::Placeholder(tenant_id) => SendTarget::Create(tenant_id),
        };
        Ok(SendPlan::Send(SendTicket {
            generation: self.generation,
            target,
            content: trimmed.to_string(),
        }))
    }

    /// Record that the gateway created the thread for a placeholder send.
    ///
    /// The ticket now points at the persisted thread, and so does the
    /// selection if it has not moved on.
    pub fn thread_created(&mut self, ticket: &mut SendTicket, thread_id: ThreadId) {
        if let SendTarget::Create(tenant_id) = ticket.target {
            ticket.target = SendTarget::Existing(thread_id);
            if !self.closed
                && ticket.generation == self.generation
                && self.active == Some(EntryKey::Placeholder(tenant_id))
            {
                self.active = Some(EntryKey::Thread(thread_id));
            }
        }
    }

    /// The send failed. The draft stays so the user can retry.
    pub fn fail_send(&mut self, ticket: SendTicket, err: ChatError) -> Result<Delivery, ChatError> {
        self.sending = false;
        if self.closed {
            return Ok(Delivery::Discarded);
        }
        if ticket.generation != self.generation || self.state != SessionState::Sending {
            warn!(
                session_id = %self.id,
                error = %err,
                "Send failed for a conversation that is no longer selected"
            );
            return Ok(Delivery::Discarded);
        }
        self.error = Some(err);
        self.transition(SessionState::Ready)?;
        Ok(Delivery::Applied)
    }

    /// The message was accepted; apply the re-fetched thread.
    ///
    /// A failed re-fetch still clears the draft, since the message went
    /// through, and attaches the error next to the old messages.
    pub fn finish_send(
        &mut self,
        ticket: SendTicket,
        refreshed: Result<ConversationEntry, ChatError>,
    ) -> Result<Delivery, ChatError> {
        self.sending = false;
        if self.closed
            || ticket.generation != self.generation
            || self.state != SessionState::Sending
        {
            return Ok(Delivery::Discarded);
        }

        self.draft.clear();
        match refreshed {
            Ok(entry) => {
                self.messages = entry.messages;
                self.error = None;
            }
            Err(err) => self.error = Some(err),
        }
        self.transition(SessionState::Ready)?;
        Ok(Delivery::Applied)
    }

    /// Flag the shown messages read if `thread` is the active conversation.
    pub fn mark_read(&mut self, thread: ThreadId) {
        if self.active == Some(EntryKey::Thread(thread)) {
            for message in &mut self.messages {
                message.is_read = true;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    /// The hosting view closed. Everything still in flight is discarded.
    pub fn close(&mut self) {
        debug!(session_id = %self.id, state = %self.state, "Session closed");
        self.closed = true;
        self.generation += 1;
        self.state = SessionState::Idle;
        self.active = None;
        self.messages.clear();
        self.sending = false;
        self.error = None;
    }

    fn ensure_open(&self) -> Result<(), ChatError> {
        if self.closed {
            Err(ChatError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, target: SessionState) -> Result<(), ChatError> {
        if self.state.can_transition_to(&target) {
            debug!(session_id = %self.id, "Session state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
