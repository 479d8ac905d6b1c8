//! Chat store: the reconciled list of conversation entries.
//!
//! Builds the merged view from a tenant roster and a raw thread list, and
//! re-merges it after partial refreshes. The merge functions are pure; the
//! [`ChatStore`] wrapper only remembers the current view and how it was
//! produced.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use parley_core::{Tenant, ThreadId};

use crate::identity::{first_match_for_tenant, same_thread, TenantReference};
use crate::types::{ConversationEntry, EntryKey};

// =============================================================================
// Pure merge functions
// =============================================================================

/// Reconcile a tenant roster with a thread list.
///
/// Produces one entry per roster tenant, in roster order (the first matching
/// thread, or a synthesized placeholder), followed by the threads no tenant
/// claimed, in their original order.
///
/// Re-running on its own output with the same roster yields the same
/// sequence. Malformed records never abort the merge:
/// - a tenant id already seen earlier in the roster is skipped;
/// - a thread whose two tenant fields disagree is never bound and ends up
///   an orphan;
/// - an unpersisted entry nobody claims is dropped, since orphans are
///   persisted threads.
pub fn reconcile(
    roster: &[Tenant],
    threads: &[ConversationEntry],
    now: DateTime<Utc>,
) -> Vec<ConversationEntry> {
    let mut consumed = vec![false; threads.len()];
    let mut seen = HashSet::with_capacity(roster.len());
    let mut merged = Vec::with_capacity(roster.len() + threads.len());

    for tenant in roster {
        if !seen.insert(tenant.id) {
            warn!(tenant_id = %tenant.id, "Duplicate roster tenant skipped");
            continue;
        }
        match first_match_for_tenant(tenant, threads, &consumed) {
            Some(i) => {
                consumed[i] = true;
                merged.push(threads[i].clone());
            }
            None => merged.push(ConversationEntry::placeholder(tenant, now)),
        }
    }

    for (thread, used) in threads.iter().zip(&consumed) {
        if *used {
            continue;
        }
        if thread.is_placeholder() {
            debug!(tenant_id = ?thread.tenant_key(), "Dropping unclaimed placeholder");
            continue;
        }
        merged.push(thread.clone());
    }

    merged
}

/// The merged view when no roster is available: the threads themselves.
///
/// Entries nothing can address (no id, no tenant) are left out.
pub fn thread_only(threads: &[ConversationEntry]) -> Vec<ConversationEntry> {
    threads
        .iter()
        .filter(|t| t.key().is_some())
        .cloned()
        .collect()
}

/// Fold refreshed threads into a previous view without re-reading the roster.
///
/// A refreshed thread replaces the previous entry with the same thread id.
/// Only a refreshed thread that matched nothing by id may fall back to
/// tenant identity, and then only onto an entry where one side is
/// unpersisted and both carry consistent tenant fields. Every previous entry
/// is replaced at most once. Refreshed threads that replaced nothing are
/// appended.
pub fn merge_after_refresh(
    previous: &[ConversationEntry],
    refreshed: &[ConversationEntry],
) -> Vec<ConversationEntry> {
    let mut slots: Vec<Option<usize>> = vec![None; previous.len()];
    let mut used = vec![false; refreshed.len()];

    for (i, candidate) in refreshed.iter().enumerate() {
        let Some(id) = candidate.id else { continue };
        let hit = previous
            .iter()
            .enumerate()
            .position(|(p, entry)| slots[p].is_none() && entry.id == Some(id));
        if let Some(p) = hit {
            slots[p] = Some(i);
            used[i] = true;
        }
    }

    for (i, candidate) in refreshed.iter().enumerate() {
        if used[i] || !candidate.has_consistent_tenant() {
            continue;
        }
        let hit = previous.iter().enumerate().position(|(p, entry)| {
            slots[p].is_none()
                && (entry.id.is_none() || candidate.id.is_none())
                && entry.has_consistent_tenant()
                && same_thread(entry, candidate)
        });
        if let Some(p) = hit {
            slots[p] = Some(i);
            used[i] = true;
        }
    }

    let mut merged: Vec<ConversationEntry> = previous
        .iter()
        .zip(&slots)
        .map(|(entry, slot)| match slot {
            Some(i) => refreshed[*i].clone(),
            None => entry.clone(),
        })
        .collect();
    merged.extend(
        refreshed
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(entry, _)| entry.clone()),
    );

    merged
}

// =============================================================================
// ChatStore
// =============================================================================

/// How the current view was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Nothing loaded yet.
    #[default]
    Empty,
    /// Roster and threads were reconciled.
    Reconciled,
    /// The roster was unavailable; only threads are shown.
    ThreadOnly,
}

/// Holds the merged view for one hosting view.
#[derive(Debug, Default)]
pub struct ChatStore {
    entries: Vec<ConversationEntry>,
    mode: ViewMode,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view with a fresh reconciliation.
    pub fn apply_roster(
        &mut self,
        roster: &[Tenant],
        threads: &[ConversationEntry],
        now: DateTime<Utc>,
    ) {
        self.entries = reconcile(roster, threads, now);
        self.mode = ViewMode::Reconciled;
        info!(
            tenants = roster.len(),
            threads = threads.len(),
            entries = self.entries.len(),
            "Roster reconciled"
        );
    }

    /// Replace the view with thread-only data after a roster failure.
    pub fn apply_threads_only(&mut self, threads: &[ConversationEntry]) {
        self.entries = thread_only(threads);
        self.mode = ViewMode::ThreadOnly;
        info!(entries = self.entries.len(), "Thread-only view applied");
    }

    /// Fold refreshed threads into the current view.
    pub fn merge_refreshed(&mut self, refreshed: &[ConversationEntry]) {
        if refreshed.is_empty() {
            return;
        }
        self.entries = merge_after_refresh(&self.entries, refreshed);
        debug!(
            refreshed = refreshed.len(),
            entries = self.entries.len(),
            "Refreshed threads merged"
        );
    }

    /// Swap a tenant's placeholder for its newly persisted thread.
    ///
    /// Thread identity falls back to the tenant when one side is
    /// unpersisted, so the placeholder is replaced in place.
    pub fn replace_placeholder(&mut self, persisted: &ConversationEntry) {
        let before = self.entries.iter().filter(|e| e.is_placeholder()).count();
        self.merge_refreshed(std::slice::from_ref(persisted));
        let after = self.entries.iter().filter(|e| e.is_placeholder()).count();
        info!(
            thread_id = ?persisted.id,
            tenant_id = ?persisted.tenant_key(),
            replaced = before.saturating_sub(after),
            "Placeholder promoted to persisted thread"
        );
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &EntryKey) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.key().as_ref() == Some(key))
    }

    /// Sum of unread counts across the view.
    pub fn total_unread(&self) -> u32 {
        self.entries
            .iter()
            .filter_map(|e| e.unread_count)
            .sum()
    }

    /// Mark a thread read locally once the gateway accepted it.
    pub fn clear_unread(&mut self, thread_id: ThreadId) {
        for entry in self.entries.iter_mut().filter(|e| e.id == Some(thread_id)) {
            entry.unread_count = Some(0);
            for message in &mut entry.messages {
                message.is_read = true;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
