//! Parley chat core.
//!
//! Reconciles a property's tenant roster with its conversation threads into
//! one merged view, and drives the conversation the user has selected through
//! load and send cycles against a [`MessagingGateway`].

pub mod controller;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod memory;
pub mod session;
pub mod store;
pub mod types;

pub use controller::ChatController;
pub use error::ChatError;
pub use gateway::{MessagingGateway, Operation};
pub use memory::{Fixture, InMemoryGateway};
pub use session::state::SessionState;
pub use session::{ConversationSession, Delivery, SessionSnapshot};
pub use store::{ChatStore, ViewMode};
pub use types::{ConversationEntry, EntryKey, Message, MessageAck, ThreadRecord};
