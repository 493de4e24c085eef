//! Reconciliation of a parsed payload against the canonical roster.
//!
//! The model is told to assign tasks only to roster members, but its output
//! is untrusted. This pass guarantees the ledger invariant: every assignee
//! key in the output is a roster member or an allowed bucket, no matter
//! what the model produced. Unassignable entries are dropped, not guessed —
//! precision over recall.

use crate::{
  ledger::{Category, LedgerPayload, TaskLedger},
  roster::Roster,
};

/// Fold `payload` into a roster-closed [`TaskLedger`].
///
/// Alias keys merge into their canonical member: tasks are appended after
/// any already collected for that member, in payload iteration order.
pub fn normalize_payload(payload: &LedgerPayload, roster: &Roster) -> TaskLedger {
  let mut ledger = TaskLedger::default();

  for category in Category::ALL {
    for (key, tasks) in payload.category(category) {
      let resolved = roster.normalize(key).or_else(|| roster.bucket(key));
      let Some(assignee) = resolved else {
        tracing::debug!(category = %category, key = %key, "dropping tasks for unrecognized assignee");
        continue;
      };

      ledger
        .category_mut(category)
        .entry(assignee)
        .or_default()
        .extend(tasks.iter().cloned());
    }
  }

  ledger
}

// ─── Tests ───────────────────────────────────────────────────────────────────
