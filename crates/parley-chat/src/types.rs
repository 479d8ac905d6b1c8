//! Conversation records exchanged with the gateway and held by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::naming;
use parley_core::{
    MessageId, PropertyId, SenderType, Tenant, TenantId, TenantSummary, ThreadId, ThreadStatus,
};

/// Subject given to threads the gateway returns without one.
pub const DEFAULT_SUBJECT: &str = "New Conversation";

// =============================================================================
// Messages
// =============================================================================

/// A single chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Parent thread.
    pub chat_id: ThreadId,
    pub sender_type: SenderType,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Gateway acknowledgement for a sent message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAck {
    pub message_id: MessageId,
    pub chat_id: ThreadId,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Threads
// =============================================================================

/// A thread exactly as the gateway returns it.
///
/// Nothing is guaranteed present; [`ConversationEntry::from_record`] applies
/// the defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadRecord {
    pub id: Option<ThreadId>,
    pub tenant_id: Option<TenantId>,
    pub tenant: Option<TenantSummary>,
    pub property_id: Option<PropertyId>,
    pub subject: Option<String>,
    pub status: Option<ThreadStatus>,
    pub messages: Option<Vec<Message>>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: Option<u32>,
}

/// Selection identity of a merged-view entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntryKey {
    /// A persisted thread.
    Thread(ThreadId),
    /// A synthesized thread for a tenant that has not messaged yet.
    Placeholder(TenantId),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Thread(id) => write!(f, "thread:{}", id),
            EntryKey::Placeholder(id) => write!(f, "placeholder:{}", id),
        }
    }
}

/// A normalized conversation thread as the merged view holds it.
///
/// `messages` is always present and sorted ascending by `created_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// `None` until the thread is persisted.
    pub id: Option<ThreadId>,
    pub tenant_id: Option<TenantId>,
    pub tenant: Option<TenantSummary>,
    pub property_id: Option<PropertyId>,
    pub subject: String,
    pub status: ThreadStatus,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: Option<u32>,
}

impl ConversationEntry {
    /// Normalize a gateway record.
    ///
    /// Absent messages become an empty sequence, messages are sorted by
    /// creation time, and missing subject/status/creation time get defaults.
    pub fn from_record(record: ThreadRecord, now: DateTime<Utc>) -> Self {
        let mut messages = record.messages.unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);

        let subject = record
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

        Self {
            id: record.id,
            tenant_id: record.tenant_id,
            tenant: record.tenant,
            property_id: record.property_id,
            subject,
            status: record.status.unwrap_or_default(),
            messages,
            created_at: record.created_at.unwrap_or(now),
            last_message_at: record.last_message_at,
            unread_count: record.unread_count,
        }
    }

    /// Synthesize the placeholder thread for a tenant with no messages yet.
    pub fn placeholder(tenant: &Tenant, now: DateTime<Utc>) -> Self {
        let created_at = tenant.created_at.unwrap_or(now);
        Self {
            id: None,
            tenant_id: Some(tenant.id),
            tenant: Some(tenant.summary()),
            property_id: None,
            subject: naming::display_name(tenant),
            status: ThreadStatus::Active,
            messages: Vec::new(),
            created_at,
            last_message_at: Some(created_at),
            unread_count: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    /// Tenant this entry belongs to, from whichever field carries it.
    pub fn tenant_key(&self) -> Option<TenantId> {
        self.tenant_id
            .or_else(|| self.tenant.as_ref().and_then(|t| t.id))
    }

    /// Selection identity, or `None` for an entry nothing can address.
    pub fn key(&self) -> Option<EntryKey> {
        match self.id {
            Some(id) => Some(EntryKey::Thread(id)),
            None => self.tenant_key().map(EntryKey::Placeholder),
        }
    }

    /// Label for the counterpart of the conversation.
    pub fn tenant_name(&self) -> Option<String> {
        self.tenant.as_ref().map(naming::summary_name)
    }

    /// Label of the unit the counterpart occupies, when known.
    pub fn unit_label(&self) -> Option<String> {
        self.tenant
            .as_ref()
            .and_then(|t| naming::unit_label(t.current_unit.as_ref()))
    }
}

/// Normalize a batch of gateway records, keeping their order.
pub fn normalize_threads(records: Vec<ThreadRecord>, now: DateTime<Utc>) -> Vec<ConversationEntry> {
    records
        .into_iter()
        .map(|r| ConversationEntry::from_record(r, now))
        .collect()
}
