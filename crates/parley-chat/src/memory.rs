//! In-memory messaging gateway.
//!
//! Backs the demo binary and the tests. Holds one property's tenants and
//! threads, assigns ids from counters, and can be told to fail or stall
//! individual operations.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{debug, info};

use parley_core::naming;
use parley_core::{
    MessageId, ParleyError, PropertyId, SenderType, Tenant, TenantId, ThreadId, ThreadStatus,
};

use crate::error::ChatError;
use crate::gateway::{MessagingGateway, Operation};
use crate::types::{Message, MessageAck, ThreadRecord, DEFAULT_SUBJECT};

/// JSON seed for [`InMemoryGateway::from_fixture`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub property_id: Option<PropertyId>,
    pub tenants: Vec<Tenant>,
    pub threads: Vec<ThreadRecord>,
}

#[derive(Debug, Default)]
struct Failures {
    once: VecDeque<ChatError>,
    always: Option<ChatError>,
}

#[derive(Debug)]
struct GatewayState {
    tenants: Vec<Tenant>,
    threads: Vec<ThreadRecord>,
    next_thread_id: i64,
    next_message_id: i64,
    failures: HashMap<Operation, Failures>,
    calls: HashMap<Operation, usize>,
    held: HashMap<ThreadId, Arc<Notify>>,
    held_ops: HashMap<Operation, Arc<Notify>>,
    latency: Option<Duration>,
}

/// A [`MessagingGateway`] that keeps everything in memory.
#[derive(Debug)]
pub struct InMemoryGateway {
    property: PropertyId,
    sender_type: SenderType,
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    pub fn new(property: PropertyId) -> Self {
        Self {
            property,
            sender_type: SenderType::PropertyManager,
            state: Mutex::new(GatewayState {
                tenants: Vec::new(),
                threads: Vec::new(),
                next_thread_id: 1,
                next_message_id: 1,
                failures: HashMap::new(),
                calls: HashMap::new(),
                held: HashMap::new(),
                held_ops: HashMap::new(),
                latency: None,
            }),
        }
    }

    /// Seed from parsed fixture data. Id counters continue after the
    /// highest ids present.
    pub fn with_fixture(property: PropertyId, fixture: Fixture) -> Self {
        let gateway = Self::new(fixture.property_id.unwrap_or(property));
        {
            let mut state = gateway.lock();
            state.next_thread_id = fixture
                .threads
                .iter()
                .filter_map(|t| t.id)
                .map(|id| id.0 + 1)
                .max()
                .unwrap_or(1);
            state.next_message_id = fixture
                .threads
                .iter()
                .flat_map(|t| t.messages.iter().flatten())
                .map(|m| m.id.0 + 1)
                .max()
                .unwrap_or(1);
            state.tenants = fixture.tenants;
            state.threads = fixture.threads;
        }
        gateway
    }

    /// Load a JSON fixture `{ "tenants": [...], "threads": [...] }` from disk.
    pub fn from_fixture(property: PropertyId, path: &Path) -> Result<Self, ParleyError> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            tenants = fixture.tenants.len(),
            threads = fixture.threads.len(),
            "Fixture loaded"
        );
        Ok(Self::with_fixture(property, fixture))
    }

    pub fn with_tenants(self, tenants: Vec<Tenant>) -> Self {
        self.lock().tenants = tenants;
        self
    }

    pub fn with_threads(self, threads: Vec<ThreadRecord>) -> Self {
        self.lock().threads = threads;
        self
    }

    pub fn with_next_thread_id(self, id: i64) -> Self {
        self.lock().next_thread_id = id;
        self
    }

    pub fn with_next_message_id(self, id: i64) -> Self {
        self.lock().next_message_id = id;
        self
    }

    /// Role stamped on messages this gateway accepts.
    pub fn with_sender_type(mut self, sender_type: SenderType) -> Self {
        self.sender_type = sender_type;
        self
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    // -------------------------------------------------------------------------
    // Failure injection and inspection
    // -------------------------------------------------------------------------

    /// Fail the next call to `op` with `err`.
    pub fn fail_next(&self, op: Operation, err: ChatError) {
        self.lock().failures.entry(op).or_default().once.push_back(err);
    }

    /// Fail every call to `op` with `err` until [`recover`](Self::recover).
    pub fn fail_always(&self, op: Operation, err: ChatError) {
        self.lock().failures.entry(op).or_default().always = Some(err);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    /// Make `fetch_thread` for `id` wait until the returned handle is
    /// notified. One notification releases one fetch.
    pub fn hold_thread(&self, id: ThreadId) -> Arc<Notify> {
        self.lock()
            .held
            .entry(id)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Make every call to `op` wait, after being counted, until the
    /// returned handle is notified. One notification releases one call.
    pub fn hold(&self, op: Operation) -> Arc<Notify> {
        self.lock()
            .held_ops
            .entry(op)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current server-side copy of a thread.
    pub fn thread(&self, id: ThreadId) -> Option<ThreadRecord> {
        self.lock().threads.iter().find(|t| t.id == Some(id)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call, then apply any injected latency, hold and failure.
    async fn enter(&self, op: Operation) -> Result<(), ChatError> {
        let (failure, latency, gate) = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            let failure = state.failures.get_mut(&op).and_then(|f| {
                f.once.pop_front().or_else(|| f.always.clone())
            });
            (failure, state.latency, state.held_ops.get(&op).cloned())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(gate) = gate {
            gate.notified().await;
        }
        debug!(operation = %op, failed = failure.is_some(), "Gateway call");
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessagingGateway for InMemoryGateway {
    async fn fetch_tenants(&self, property: PropertyId) -> Result<Vec<Tenant>, ChatError> {
        self.enter(Operation::FetchTenants).await?;
        if property != self.property {
            return Ok(Vec::new());
        }
        Ok(self.lock().tenants.clone())
    }

    async fn fetch_threads(
        &self,
        property: PropertyId,
        status: Option<ThreadStatus>,
    ) -> Result<Vec<ThreadRecord>, ChatError> {
        self.enter(Operation::FetchThreads).await?;
        let state = self.lock();
        let threads = state
            .threads
            .iter()
            .filter(|t| t.property_id.map_or(property == self.property, |p| p == property))
            .filter(|t| status.map_or(true, |s| t.status.unwrap_or_default() == s))
            .map(|t| ThreadRecord {
                // Listings carry no message bodies
                messages: None,
                ..t.clone()
            })
            .collect();
        Ok(threads)
    }

    async fn fetch_thread(&self, id: ThreadId) -> Result<ThreadRecord, ChatError> {
        self.enter(Operation::FetchThread).await?;
        let gate = self.lock().held.get(&id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.lock();
        let thread = state
            .threads
            .iter()
            .find(|t| t.id == Some(id))
            .ok_or(ChatError::NotFound(id))?;
        let mut thread = thread.clone();
        thread.messages.get_or_insert_with(Vec::new);
        Ok(thread)
    }

    async fn create_thread(
        &self,
        property: PropertyId,
        tenant: TenantId,
    ) -> Result<ThreadRecord, ChatError> {
        self.enter(Operation::CreateThread).await?;
        let mut state = self.lock();

        // One thread per tenant: hand back the existing one
        if let Some(existing) = state.threads.iter().find(|t| t.tenant_id == Some(tenant)) {
            return Ok(existing.clone());
        }

        let record = state
            .tenants
            .iter()
            .find(|t| t.id == tenant)
            .cloned()
            .ok_or_else(|| ChatError::ValidationFailure(format!("unknown tenant {}", tenant)))?;
        let now = Utc::now();
        let id = ThreadId(state.next_thread_id);
        state.next_thread_id += 1;

        let thread = ThreadRecord {
            id: Some(id),
            tenant_id: Some(tenant),
            tenant: Some(record.summary()),
            property_id: Some(property),
            subject: Some(naming::display_name(&record)),
            status: Some(ThreadStatus::Active),
            messages: Some(Vec::new()),
            created_at: Some(now),
            last_message_at: Some(now),
            unread_count: Some(0),
        };
        state.threads.push(thread.clone());
        info!(thread_id = %id, tenant_id = %tenant, "Thread created");
        Ok(thread)
    }

    async fn send_message(&self, thread: ThreadId, content: &str) -> Result<MessageAck, ChatError> {
        self.enter(Operation::SendMessage).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::ValidationFailure(
                "message cannot be empty".to_string(),
            ));
        }

        let mut state = self.lock();
        let message_id = MessageId(state.next_message_id);
        let index = state
            .threads
            .iter()
            .position(|t| t.id == Some(thread))
            .ok_or(ChatError::NotFound(thread))?;
        state.next_message_id += 1;

        let now = Utc::now();
        let record = &mut state.threads[index];
        record.messages.get_or_insert_with(Vec::new).push(Message {
            id: message_id,
            chat_id: thread,
            sender_type: self.sender_type,
            content: content.to_string(),
            is_read: false,
            created_at: now,
        });
        record.last_message_at = Some(now);

        Ok(MessageAck {
            message_id,
            chat_id: thread,
            created_at: now,
        })
    }

    async fn mark_read(&self, thread: ThreadId) -> Result<(), ChatError> {
        self.enter(Operation::MarkRead).await?;
        let mut state = self.lock();
        let record = state
            .threads
            .iter_mut()
            .find(|t| t.id == Some(thread))
            .ok_or(ChatError::NotFound(thread))?;
        record.unread_count = Some(0);
        for message in record.messages.iter_mut().flatten() {
            message.is_read = true;
        }
        Ok(())
    }

    async fn update_thread(
        &self,
        thread: ThreadId,
        status: Option<ThreadStatus>,
        subject: Option<&str>,
    ) -> Result<ThreadRecord, ChatError> {
        self.enter(Operation::UpdateThread).await?;
        let mut state = self.lock();
        let record = state
            .threads
            .iter_mut()
            .find(|t| t.id == Some(thread))
            .ok_or(ChatError::NotFound(thread))?;
        if let Some(subject) = subject {
            let subject = subject.trim();
            record.subject = Some(if subject.is_empty() {
                DEFAULT_SUBJECT.to_string()
            } else {
                subject.to_string()
            });
        }
        if let Some(status) = status {
            record.status = Some(status);
        }
        info!(thread_id = %thread, status = ?record.status, "Thread updated");

        let mut updated = record.clone();
        updated.messages.get_or_insert_with(Vec::new);
        Ok(updated)
    }
}
