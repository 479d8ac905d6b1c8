use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Server-assigned tenant identifier.
    TenantId
);
id_newtype!(
    /// Server-assigned conversation thread identifier.
    ThreadId
);
id_newtype!(
    /// Server-assigned message identifier.
    MessageId
);
id_newtype!(
    /// Property the roster and threads belong to.
    PropertyId
);
id_newtype!(UnitId);

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Tenant,
    PropertyManager,
    Staff,
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::Tenant => write!(f, "tenant"),
            SenderType::PropertyManager => write!(f, "property_manager"),
            SenderType::Staff => write!(f, "staff"),
        }
    }
}

/// Lifecycle status of a persisted thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Active,
    Archived,
    Closed,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::Active => write!(f, "active"),
            ThreadStatus::Archived => write!(f, "archived"),
            ThreadStatus::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Roster records
// =============================================================================

/// The user account behind a tenant, as far as naming is concerned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Reference to the unit a tenant currently occupies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: UnitId,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A tenant on a property roster.
///
/// Read-only from the messaging core's point of view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// Explicit display name, when the roster already resolved one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub current_unit: Option<UnitRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Bare tenant with only an id, mostly useful in tests and fixtures.
    pub fn new(id: i64) -> Self {
        Self {
            id: TenantId(id),
            name: None,
            user: None,
            current_unit: None,
            created_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// The embedded reference a thread carries for this tenant.
    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            id: Some(self.id),
            name: Some(crate::naming::display_name(self)),
            user: self.user.clone(),
            current_unit: self.current_unit.clone(),
        }
    }
}

/// Tenant reference embedded in a thread record.
///
/// Every field is optional because the gateway may send a partial object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSummary {
    pub id: Option<TenantId>,
    pub name: Option<String>,
    pub user: Option<UserProfile>,
    pub current_unit: Option<UnitRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_from() {
        assert_eq!(TenantId::from(7).to_string(), "7");
        assert_eq!(ThreadId(55).to_string(), "55");
        assert_eq!(MessageId(900), MessageId::from(900));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&ThreadId(55)).unwrap();
        assert_eq!(json, "55");
        let id: TenantId = serde_json::from_str("12").unwrap();
        assert_eq!(id, TenantId(12));
    }

    #[test]
    fn test_sender_type_serde() {
        let json = serde_json::to_string(&SenderType::PropertyManager).unwrap();
        assert_eq!(json, "\"property_manager\"");
        let parsed: SenderType = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(parsed, SenderType::Staff);
        assert_eq!(SenderType::Tenant.to_string(), "tenant");
    }

    #[test]
    fn test_thread_status_default_is_active() {
        assert_eq!(ThreadStatus::default(), ThreadStatus::Active);
        assert_eq!(ThreadStatus::Archived.to_string(), "archived");
    }

    #[test]
    fn test_tenant_deserializes_with_missing_optionals() {
        let tenant: Tenant = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(tenant.id, TenantId(3));
        assert!(tenant.name.is_none());
        assert!(tenant.user.is_none());
        assert!(tenant.current_unit.is_none());
        assert!(tenant.created_at.is_none());
    }

    #[test]
    fn test_tenant_summary_carries_resolved_name() {
        let tenant = Tenant::new(1).with_user(UserProfile {
            first_name: Some("Alice".into()),
            last_name: Some("Moreau".into()),
            email: None,
        });
        let summary = tenant.summary();
        assert_eq!(summary.id, Some(TenantId(1)));
        assert_eq!(summary.name.as_deref(), Some("Alice Moreau"));
    }
}
