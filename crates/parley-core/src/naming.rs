//! Field resolution for tenant display names and unit labels.
//!
//! Roster and thread records reach us in different shapes: some carry an
//! explicit name, some only a user profile, some only an e-mail address.
//! Each resolver walks a fixed precedence list and returns the first source
//! that yields a non-empty value.

use crate::types::{Tenant, TenantSummary, UnitRef, UserProfile};

/// Sources a display name can be resolved from, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameSource {
    /// The record's own `name` field.
    Explicit,
    /// `first_name last_name` from the user profile.
    FullName,
    /// Title-cased local part of the user's e-mail address.
    EmailHandle,
}

/// Display name precedence. The `Tenant {id}` fallback applies after these.
pub const NAME_PRECEDENCE: [NameSource; 3] = [
    NameSource::Explicit,
    NameSource::FullName,
    NameSource::EmailHandle,
];

impl NameSource {
    fn resolve(self, explicit: Option<&str>, user: Option<&UserProfile>) -> Option<String> {
        match self {
            NameSource::Explicit => non_empty(explicit),
            NameSource::FullName => {
                let user = user?;
                let full = format!(
                    "{} {}",
                    user.first_name.as_deref().unwrap_or("").trim(),
                    user.last_name.as_deref().unwrap_or("").trim()
                );
                non_empty(Some(&full))
            }
            NameSource::EmailHandle => user?.email.as_deref().and_then(email_handle),
        }
    }
}

/// Resolve the display name of a roster tenant.
///
/// Falls back to `Tenant {id}` when no source yields a value.
pub fn display_name(tenant: &Tenant) -> String {
    resolve_name(tenant.name.as_deref(), tenant.user.as_ref())
        .unwrap_or_else(|| format!("Tenant {}", tenant.id))
}

/// Resolve the display name of a tenant reference embedded in a thread.
///
/// Falls back to `Tenant {id}`, or `Unknown` when the reference has no id.
pub fn summary_name(summary: &TenantSummary) -> String {
    resolve_name(summary.name.as_deref(), summary.user.as_ref()).unwrap_or_else(|| {
        match summary.id {
            Some(id) => format!("Tenant {}", id),
            None => "Unknown".to_string(),
        }
    })
}

fn resolve_name(explicit: Option<&str>, user: Option<&UserProfile>) -> Option<String> {
    NAME_PRECEDENCE
        .iter()
        .find_map(|source| source.resolve(explicit, user))
}

/// Turn `john.doe@example.com` into `John Doe`.
///
/// Splits the local part on `.`, `_` and `-`. Returns `None` when nothing
/// usable remains.
pub fn email_handle(email: &str) -> Option<String> {
    let local = email.split('@').next().unwrap_or("").trim();
    let words: Vec<String> = local
        .split(['.', '_', '-'])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Resolve a human label for a unit.
///
/// Precedence: `unit_name`, `unit_number`, `name`, then `Unit {id}`.
/// An absent unit has no label.
pub fn unit_label(unit: Option<&UnitRef>) -> Option<String> {
    let unit = unit?;
    let label = [&unit.unit_name, &unit.unit_number, &unit.name]
        .into_iter()
        .find_map(|field| non_empty(field.as_deref()))
        .unwrap_or_else(|| format!("Unit {}", unit.id));
    Some(label)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    fn user(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> UserProfile {
        UserProfile {
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_explicit_name_wins() {
        let tenant = Tenant::new(1)
            .with_name("Alice")
            .with_user(user(Some("Alicia"), Some("Keys"), Some("a@x.io")));
        assert_eq!(display_name(&tenant), "Alice");
    }

    #[test]
    fn test_blank_explicit_name_is_skipped() {
        let tenant = Tenant::new(1)
            .with_name("   ")
            .with_user(user(Some("Alicia"), Some("Keys"), None));
        assert_eq!(display_name(&tenant), "Alicia Keys");
    }

    #[test]
    fn test_full_name_with_one_part() {
        let tenant = Tenant::new(1).with_user(user(None, Some("Keys"), None));
        assert_eq!(display_name(&tenant), "Keys");

        let tenant = Tenant::new(1).with_user(user(Some("Alicia"), None, None));
        assert_eq!(display_name(&tenant), "Alicia");
    }

    #[test]
    fn test_email_handle_fallback() {
        let tenant = Tenant::new(1).with_user(user(None, None, Some("john.doe@example.com")));
        assert_eq!(display_name(&tenant), "John Doe");
    }

    #[test]
    fn test_id_fallback() {
        assert_eq!(display_name(&Tenant::new(42)), "Tenant 42");
        let tenant = Tenant::new(42).with_user(user(Some(""), Some(""), Some("@nowhere")));
        assert_eq!(display_name(&tenant), "Tenant 42");
    }

    #[test]
    fn test_email_handle_variants() {
        assert_eq!(email_handle("MARY_ann-lee@x.io").as_deref(), Some("Mary Ann Lee"));
        assert_eq!(email_handle("solo").as_deref(), Some("Solo"));
        assert_eq!(email_handle("..@x.io"), None);
        assert_eq!(email_handle(""), None);
    }

    #[test]
    fn test_summary_name_fallbacks() {
        let summary = TenantSummary {
            id: Some(crate::types::TenantId(9)),
            name: None,
            user: None,
            current_unit: None,
        };
        assert_eq!(summary_name(&summary), "Tenant 9");
        assert_eq!(summary_name(&TenantSummary::default()), "Unknown");

        let summary = TenantSummary {
            id: None,
            name: Some("Bob".into()),
            user: None,
            current_unit: None,
        };
        assert_eq!(summary_name(&summary), "Bob");
    }

    #[test]
    fn test_unit_label_precedence() {
        let mut unit = UnitRef {
            id: UnitId(4),
            unit_name: Some("Loft A".into()),
            unit_number: Some("4A".into()),
            name: Some("Unit four".into()),
        };
        assert_eq!(unit_label(Some(&unit)).as_deref(), Some("Loft A"));

        unit.unit_name = None;
        assert_eq!(unit_label(Some(&unit)).as_deref(), Some("4A"));

        unit.unit_number = Some(" ".into());
        assert_eq!(unit_label(Some(&unit)).as_deref(), Some("Unit four"));

        unit.name = None;
        assert_eq!(unit_label(Some(&unit)).as_deref(), Some("Unit 4"));

        assert_eq!(unit_label(None), None);
    }
}
