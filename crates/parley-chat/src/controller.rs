//! Chat controller: wires the gateway, the chat store and the session.
//!
//! One controller serves one hosting view. It owns the store and the session
//! behind plain mutexes that are never held across an await, bounds every
//! gateway call with the configured timeout, and races it against the view's
//! cancellation token. Once the token fires, late answers are dropped without
//! touching either the store or the session.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_core::config::ChatConfig;
use parley_core::{ParleyConfig, PropertyId, ThreadId, ThreadStatus};

use crate::error::ChatError;
use crate::gateway::{MessagingGateway, Operation};
use crate::session::{
    ConversationSession, Delivery, LoadTicket, SelectPlan, SendPlan, SendTarget, SendTicket,
    SessionSnapshot,
};
use crate::store::{ChatStore, ViewMode};
use crate::types::{normalize_threads, ConversationEntry, EntryKey};

/// Coordinates the merged view and the active conversation of one view.
pub struct ChatController {
    gateway: Arc<dyn MessagingGateway>,
    store: Mutex<ChatStore>,
    session: Mutex<ConversationSession>,
    cancel: CancellationToken,
    config: ChatConfig,
    property: PropertyId,
    timeout: Duration,
}

impl ChatController {
    pub fn new(gateway: Arc<dyn MessagingGateway>, config: &ParleyConfig) -> Self {
        Self {
            gateway,
            store: Mutex::new(ChatStore::new()),
            session: Mutex::new(ConversationSession::new(config.chat.max_message_length)),
            cancel: CancellationToken::new(),
            config: config.chat.clone(),
            property: config.gateway.property(),
            timeout: config.gateway.request_timeout(),
        }
    }

    /// Tie the controller to the hosting view's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn property(&self) -> PropertyId {
        self.property
    }

    // =========================================================================
    // Merged view
    // =========================================================================

    /// Fetch roster and threads and rebuild the merged view.
    ///
    /// A roster failure falls back to the thread-only view and is not
    /// surfaced. A thread failure is returned and leaves the view untouched.
    pub async fn initialize(&self) -> Result<Delivery, ChatError> {
        let delivery = self.load_view().await?;
        info!(
            property_id = %self.property,
            entries = self.lock_store().len(),
            "Chat initialized"
        );
        Ok(delivery)
    }

    /// Re-read roster and threads, replacing the merged view.
    pub async fn refresh_roster(&self) -> Result<Delivery, ChatError> {
        self.load_view().await
    }

    async fn load_view(&self) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let status = self.config.status();
        let (roster, threads) = tokio::join!(
            self.call(
                Operation::FetchTenants,
                self.gateway.fetch_tenants(self.property)
            ),
            self.call(
                Operation::FetchThreads,
                self.gateway.fetch_threads(self.property, status)
            ),
        );
        let (Some(roster), Some(threads)) = (roster, threads) else {
            return Ok(self.abandon());
        };

        let now = Utc::now();
        let threads = match threads {
            Ok(records) => normalize_threads(records, now),
            Err(err) => {
                warn!(error = %err, "Thread list unavailable, keeping current view");
                return Err(err);
            }
        };

        let mut store = self.lock_store();
        match roster {
            Ok(roster) => store.apply_roster(&roster, &threads, now),
            Err(err) => {
                warn!(error = %err, "Roster unavailable, showing threads only");
                store.apply_threads_only(&threads);
            }
        }
        Ok(Delivery::Applied)
    }

    pub fn merged_view(&self) -> Vec<ConversationEntry> {
        self.lock_store().entries().to_vec()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.lock_store().mode()
    }

    pub fn total_unread(&self) -> u32 {
        self.lock_store().total_unread()
    }

    // =========================================================================
    // Conversation session
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_session().snapshot()
    }

    /// Keep what the user is typing; it survives failed sends.
    pub fn set_draft(&self, text: &str) {
        self.lock_session().set_draft(text);
    }

    /// Make the entry with `key` the active conversation, loading its
    /// messages when the view does not carry them yet.
    ///
    /// Returns `Discarded` when `key` is already active with a send in
    /// flight; that send re-fetches the thread itself.
    pub async fn select(&self, key: &EntryKey) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let entry = self
            .lock_store()
            .get(key)
            .cloned()
            .ok_or(ChatError::UnknownEntry(*key))?;
        let plan = self.lock_session().select(&entry)?;
        match plan {
            SelectPlan::Ready => Ok(Delivery::Applied),
            SelectPlan::Load(ticket) => self.load(ticket).await,
            SelectPlan::InFlight => Ok(Delivery::Discarded),
        }
    }

    /// Select the active entry again after a failure.
    pub async fn retry(&self) -> Result<Delivery, ChatError> {
        let key = self.lock_session().active().ok_or(ChatError::NoActiveEntry)?;
        self.select(&key).await
    }

    /// Re-fetch the active thread without changing the selection.
    ///
    /// Returns `Discarded` when there is nothing to fetch.
    pub async fn refresh_active(&self) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let ticket = self.lock_session().begin_refresh()?;
        match ticket {
            Some(ticket) => self.load(ticket).await,
            None => Ok(Delivery::Discarded),
        }
    }

    async fn load(&self, ticket: LoadTicket) -> Result<Delivery, ChatError> {
        let thread_id = ticket.thread_id;
        let Some(result) = self
            .call(Operation::FetchThread, self.gateway.fetch_thread(thread_id))
            .await
        else {
            return Ok(self.abandon());
        };

        let result = result.map(|record| ConversationEntry::from_record(record, Utc::now()));
        let loaded = result.as_ref().ok().cloned();
        let delivery = self.lock_session().complete_load(ticket, result)?;

        if let (Delivery::Applied, Some(entry)) = (delivery, loaded) {
            self.lock_store().merge_refreshed(std::slice::from_ref(&entry));
            debug!(thread_id = %thread_id, messages = entry.messages.len(), "Thread loaded");
        }
        Ok(delivery)
    }

    /// Send `content` to the active conversation.
    ///
    /// A placeholder gets its thread created first; the view swaps the
    /// placeholder for the persisted thread as soon as it exists. After the
    /// gateway accepts the message the thread is re-fetched so the view shows
    /// server-assigned ids and timestamps. Returns `Discarded` when another
    /// send is still in flight.
    pub async fn send(&self, content: &str) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let plan = self.lock_session().begin_send(content)?;
        let mut ticket = match plan {
            SendPlan::Suppressed => return Ok(Delivery::Discarded),
            SendPlan::Send(ticket) => ticket,
        };

        let thread_id = match ticket.target() {
            SendTarget::Existing(id) => id,
            SendTarget::Create(tenant_id) => {
                let created = self
                    .call(
                        Operation::CreateThread,
                        self.gateway.create_thread(self.property, tenant_id),
                    )
                    .await;
                let entry = match created {
                    None => return Ok(self.abandon()),
                    Some(Err(err)) => return self.send_failed(ticket, err),
                    Some(Ok(record)) => ConversationEntry::from_record(record, Utc::now()),
                };
                let Some(id) = entry.id else {
                    let err = ChatError::NetworkFailure("created thread has no id".to_string());
                    return self.send_failed(ticket, err);
                };
                self.lock_store().replace_placeholder(&entry);
                self.lock_session().thread_created(&mut ticket, id);
                id
            }
        };

        let sent = self
            .call(
                Operation::SendMessage,
                self.gateway.send_message(thread_id, ticket.content()),
            )
            .await;
        match sent {
            None => return Ok(self.abandon()),
            Some(Err(err)) => return self.send_failed(ticket, err),
            Some(Ok(ack)) => info!(
                thread_id = %thread_id,
                message_id = %ack.message_id,
                "Message sent"
            ),
        }

        let refreshed = match self
            .call(Operation::FetchThread, self.gateway.fetch_thread(thread_id))
            .await
        {
            None => return Ok(self.abandon()),
            Some(result) => result.map(|record| ConversationEntry::from_record(record, Utc::now())),
        };
        match &refreshed {
            Ok(entry) => self.lock_store().merge_refreshed(std::slice::from_ref(entry)),
            Err(err) => warn!(thread_id = %thread_id, error = %err, "Re-fetch after send failed"),
        }
        self.lock_session().finish_send(ticket, refreshed)
    }

    fn send_failed(&self, ticket: SendTicket, err: ChatError) -> Result<Delivery, ChatError> {
        warn!(error = %err, "Send failed, draft kept");
        let delivery = self.lock_session().fail_send(ticket, err.clone())?;
        if self.cancel.is_cancelled() {
            return Ok(delivery);
        }
        Err(err)
    }

    /// Mark the active thread read on the gateway and in the view.
    pub async fn mark_active_read(&self) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let Some(thread_id) = self.active_thread()? else {
            return Ok(Delivery::Discarded);
        };
        match self
            .call(Operation::MarkRead, self.gateway.mark_read(thread_id))
            .await
        {
            None => Ok(self.abandon()),
            Some(Err(err)) => {
                warn!(thread_id = %thread_id, error = %err, "Mark read failed");
                Err(err)
            }
            Some(Ok(())) => {
                self.lock_store().clear_unread(thread_id);
                self.lock_session().mark_read(thread_id);
                debug!(thread_id = %thread_id, "Thread marked read");
                Ok(Delivery::Applied)
            }
        }
    }

    /// Archive, close or rename the active thread.
    ///
    /// The updated thread is folded into the view in place; it only leaves
    /// the view when a later roster refresh filters it out. A placeholder
    /// has nothing to update and yields `Discarded`.
    pub async fn update_active_thread(
        &self,
        status: Option<ThreadStatus>,
        subject: Option<&str>,
    ) -> Result<Delivery, ChatError> {
        self.ensure_open()?;
        let Some(thread_id) = self.active_thread()? else {
            return Ok(Delivery::Discarded);
        };
        let updated = match self
            .call(
                Operation::UpdateThread,
                self.gateway.update_thread(thread_id, status, subject),
            )
            .await
        {
            None => return Ok(self.abandon()),
            Some(Err(err)) => {
                warn!(thread_id = %thread_id, error = %err, "Thread update failed");
                return Err(err);
            }
            Some(Ok(record)) => ConversationEntry::from_record(record, Utc::now()),
        };
        info!(
            thread_id = %thread_id,
            status = %updated.status,
            subject = %updated.subject,
            "Thread updated"
        );
        self.lock_store().merge_refreshed(std::slice::from_ref(&updated));
        Ok(Delivery::Applied)
    }

    /// The hosting view closed: abandon in-flight work and reset the session.
    pub fn close(&self) {
        self.cancel.cancel();
        self.lock_session().close();
        info!(property_id = %self.property, "Chat closed");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run a gateway call under the timeout, racing the cancellation token.
    ///
    /// `None` means the view closed before the call finished.
    async fn call<T, F>(&self, op: Operation, fut: F) -> Option<Result<T, ChatError>>
    where
        F: Future<Output = Result<T, ChatError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(operation = %op, "Gateway call abandoned");
                None
            }
            result = tokio::time::timeout(self.timeout, fut) => Some(match result {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        operation = %op,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Gateway call timed out"
                    );
                    Err(ChatError::timed_out(op.as_str(), self.timeout))
                }
            }),
        }
    }

    fn abandon(&self) -> Delivery {
        self.lock_session().close();
        Delivery::Discarded
    }

    /// The active persisted thread, `None` for a placeholder.
    fn active_thread(&self) -> Result<Option<ThreadId>, ChatError> {
        match self.lock_session().active() {
            Some(EntryKey::Thread(id)) => Ok(Some(id)),
            Some(EntryKey::Placeholder(_)) => Ok(None),
            None => Err(ChatError::NoActiveEntry),
        }
    }

    fn ensure_open(&self) -> Result<(), ChatError> {
        if self.cancel.is_cancelled() {
            Err(ChatError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, ChatStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_session(&self) -> MutexGuard<'_, ConversationSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}
