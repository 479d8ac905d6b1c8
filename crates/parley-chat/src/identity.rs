//! Identity rules shared by reconciliation and refresh merging.
//!
//! A record may name its tenant directly (`tenant_id`) or through an
//! embedded tenant object (`tenant.id`), and the two sides of a comparison
//! do not have to use the same representation. An absent value never matches
//! another absent value.

use parley_core::{Tenant, TenantId};

use crate::types::ConversationEntry;

/// Anything that can refer to a tenant.
pub trait TenantReference {
    /// The flat `tenant_id` field.
    fn direct_tenant_id(&self) -> Option<TenantId>;
    /// The id of the embedded tenant object.
    fn embedded_tenant_id(&self) -> Option<TenantId>;

    /// A record whose two tenant fields disagree cannot be bound to anyone.
    fn has_consistent_tenant(&self) -> bool {
        match (self.direct_tenant_id(), self.embedded_tenant_id()) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl TenantReference for Tenant {
    fn direct_tenant_id(&self) -> Option<TenantId> {
        Some(self.id)
    }

    fn embedded_tenant_id(&self) -> Option<TenantId> {
        Some(self.id)
    }
}

impl TenantReference for ConversationEntry {
    fn direct_tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn embedded_tenant_id(&self) -> Option<TenantId> {
        self.tenant.as_ref().and_then(|t| t.id)
    }
}

fn present_eq(a: Option<TenantId>, b: Option<TenantId>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Tenant-identity equality.
///
/// `a.tenant_id == b.tenant.id || a.tenant.id == b.tenant_id ||
/// a.tenant_id == b.tenant_id`, with absent values never equal.
pub fn same_tenant<A, B>(a: &A, b: &B) -> bool
where
    A: TenantReference + ?Sized,
    B: TenantReference + ?Sized,
{
    present_eq(a.direct_tenant_id(), b.embedded_tenant_id())
        || present_eq(a.embedded_tenant_id(), b.direct_tenant_id())
        || present_eq(a.direct_tenant_id(), b.direct_tenant_id())
}

/// Thread-identity equality.
///
/// Two persisted threads are the same thread exactly when their ids match.
/// If either side is unpersisted, tenant identity decides.
pub fn same_thread(a: &ConversationEntry, b: &ConversationEntry) -> bool {
    match (a.id, b.id) {
        (Some(x), Some(y)) => x == y,
        _ => same_tenant(a, b),
    }
}

/// Index of the first candidate, in scan order, that belongs to `tenant`
/// and is still available.
pub fn first_match_for_tenant(
    tenant: &Tenant,
    candidates: &[ConversationEntry],
    consumed: &[bool],
) -> Option<usize> {
    candidates.iter().enumerate().position(|(i, candidate)| {
        !consumed.get(i).copied().unwrap_or(false)
            && candidate.has_consistent_tenant()
            && same_tenant(candidate, tenant)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreadRecord;
    use chrono::Utc;
    use parley_core::{TenantSummary, ThreadId};

    fn entry(id: Option<i64>, tenant_id: Option<i64>, embedded: Option<i64>) -> ConversationEntry {
        let record = ThreadRecord {
            id: id.map(ThreadId),
            tenant_id: tenant_id.map(TenantId),
            tenant: embedded.map(|e| TenantSummary {
                id: Some(TenantId(e)),
                name: None,
                user: None,
                current_unit: None,
            }),
            ..ThreadRecord::default()
        };
        ConversationEntry::from_record(record, Utc::now())
    }

    #[test]
    fn test_same_tenant_direct_fields() {
        assert!(same_tenant(&entry(None, Some(1), None), &entry(None, Some(1), None)));
        assert!(!same_tenant(&entry(None, Some(1), None), &entry(None, Some(2), None)));
    }

    #[test]
    fn test_same_tenant_cross_representation() {
        let flat = entry(Some(10), Some(7), None);
        let nested = entry(Some(11), None, Some(7));
        assert!(same_tenant(&flat, &nested));
        assert!(same_tenant(&nested, &flat));
    }

    #[test]
    fn test_absent_never_matches_absent() {
        let a = entry(Some(1), None, None);
        let b = entry(Some(2), None, None);
        assert!(!same_tenant(&a, &b));
    }

    #[test]
    fn test_same_tenant_against_roster_tenant() {
        let tenant = Tenant::new(7);
        assert!(same_tenant(&entry(Some(1), Some(7), None), &tenant));
        assert!(same_tenant(&entry(Some(1), None, Some(7)), &tenant));
        assert!(!same_tenant(&entry(Some(1), Some(8), None), &tenant));
    }

    #[test]
    fn test_same_thread_uses_ids_when_both_persisted() {
        // Same tenant, different persisted threads.
        let a = entry(Some(1), Some(7), None);
        let b = entry(Some(2), Some(7), None);
        assert!(!same_thread(&a, &b));
        assert!(same_thread(&a, &entry(Some(1), None, None)));
    }

    #[test]
    fn test_same_thread_falls_back_to_tenant_for_placeholders() {
        let placeholder = entry(None, Some(7), None);
        let persisted = entry(Some(55), Some(7), None);
        assert!(same_thread(&placeholder, &persisted));
        assert!(same_thread(&persisted, &placeholder));
        assert!(!same_thread(&placeholder, &entry(Some(56), Some(8), None)));
    }

    #[test]
    fn test_inconsistent_tenant_fields() {
        assert!(!entry(Some(1), Some(7), Some(8)).has_consistent_tenant());
        assert!(entry(Some(1), Some(7), Some(7)).has_consistent_tenant());
        assert!(entry(Some(1), None, None).has_consistent_tenant());
    }

    #[test]
    fn test_first_match_wins_and_skips_consumed() {
        let tenant = Tenant::new(7);
        let candidates = vec![
            entry(Some(1), Some(3), None),
            entry(Some(2), Some(7), None),
            entry(Some(3), None, Some(7)),
        ];
        assert_eq!(first_match_for_tenant(&tenant, &candidates, &[false; 3]), Some(1));
        assert_eq!(
            first_match_for_tenant(&tenant, &candidates, &[false, true, false]),
            Some(2)
        );
        assert_eq!(
            first_match_for_tenant(&Tenant::new(99), &candidates, &[false; 3]),
            None
        );
    }

    #[test]
    fn test_first_match_ignores_inconsistent_candidates() {
        let tenant = Tenant::new(7);
        let candidates = vec![entry(Some(1), Some(7), Some(8)), entry(Some(2), Some(7), None)];
        assert_eq!(first_match_for_tenant(&tenant, &candidates, &[false; 2]), Some(1));
    }
}
