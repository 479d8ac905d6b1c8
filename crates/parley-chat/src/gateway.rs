//! Messaging gateway abstraction.
//!
//! Every remote call the chat core makes goes through [`MessagingGateway`].
//! Implementations own transport, authentication and serialization; the core
//! only sees records and [`ChatError`]s.

use async_trait::async_trait;

use parley_core::{PropertyId, Tenant, TenantId, ThreadId, ThreadStatus};

use crate::error::ChatError;
use crate::types::{MessageAck, ThreadRecord};

/// Gateway operations, used for logging and failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchTenants,
    FetchThreads,
    FetchThread,
    CreateThread,
    SendMessage,
    MarkRead,
    UpdateThread,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::FetchTenants => "fetch_tenants",
            Operation::FetchThreads => "fetch_threads",
            Operation::FetchThread => "fetch_thread",
            Operation::CreateThread => "create_thread",
            Operation::SendMessage => "send_message",
            Operation::MarkRead => "mark_read",
            Operation::UpdateThread => "update_thread",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote messaging backend.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Roster of the property's current tenants.
    async fn fetch_tenants(&self, property: PropertyId) -> Result<Vec<Tenant>, ChatError>;

    /// Threads of a property, optionally filtered by status.
    async fn fetch_threads(
        &self,
        property: PropertyId,
        status: Option<ThreadStatus>,
    ) -> Result<Vec<ThreadRecord>, ChatError>;

    /// One thread with its messages.
    async fn fetch_thread(&self, id: ThreadId) -> Result<ThreadRecord, ChatError>;

    /// Create (or return the existing) thread between the property and a tenant.
    async fn create_thread(
        &self,
        property: PropertyId,
        tenant: TenantId,
    ) -> Result<ThreadRecord, ChatError>;

    async fn send_message(&self, thread: ThreadId, content: &str) -> Result<MessageAck, ChatError>;

    /// Mark every message of a thread read for the caller.
    async fn mark_read(&self, thread: ThreadId) -> Result<(), ChatError>;

    /// Change a thread's status and/or subject. `None` leaves a field as it
    /// is; a blank subject resets it to the default. Returns the updated
    /// thread with its messages.
    async fn update_thread(
        &self,
        thread: ThreadId,
        status: Option<ThreadStatus>,
        subject: Option<&str>,
    ) -> Result<ThreadRecord, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::FetchTenants.to_string(), "fetch_tenants");
        assert_eq!(Operation::CreateThread.as_str(), "create_thread");
        assert_eq!(Operation::MarkRead.to_string(), "mark_read");
        assert_eq!(Operation::UpdateThread.as_str(), "update_thread");
    }
}
