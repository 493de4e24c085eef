//! The per-person task ledger and its category structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Category ────────────────────────────────────────────────────────────────

/// The three fixed ledger categories. The serialized names double as the
/// keys expected in model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
  Pending,
  Completed,
  Issue,
}

impl Category {
  pub const ALL: [Category; 3] =
    [Category::Pending, Category::Completed, Category::Issue];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Pending => "Pending",
      Category::Completed => "Completed",
      Category::Issue => "Issue",
    }
  }
}

impl std::str::FromStr for Category {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Pending" => Ok(Category::Pending),
      "Completed" => Ok(Category::Completed),
      "Issue" => Ok(Category::Issue),
      other => Err(Error::UnknownCategory(other.to_string())),
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// Assignee name → ordered task descriptions. Order within a list is
/// preserve-on-insert; the map itself is keyed deterministically.
pub type Assignments = BTreeMap<String, Vec<String>>;

// ─── Payload (unvalidated) ───────────────────────────────────────────────────

/// Model output after shape validation but *before* roster reconciliation:
/// the assignee keys are whatever strings the model produced.
///
/// Only the [normalizer](crate::normalize) turns this into a [`TaskLedger`],
/// which is why the two shapes are distinct types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerPayload {
  pub pending:   Assignments,
  pub completed: Assignments,
  pub issues:    Assignments,
}

impl LedgerPayload {
  pub fn category(&self, category: Category) -> &Assignments {
    match category {
      Category::Pending => &self.pending,
      Category::Completed => &self.completed,
      Category::Issue => &self.issues,
    }
  }

  pub fn category_mut(&mut self, category: Category) -> &mut Assignments {
    match category {
      Category::Pending => &mut self.pending,
      Category::Completed => &mut self.completed,
      Category::Issue => &mut self.issues,
    }
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The roster-closed task ledger produced by one analysis run.
///
/// Invariants upheld by the normalizer: every assignee key is a roster
/// member or an allowed bucket, and every task string is non-empty after
/// trimming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLedger {
  #[serde(rename = "Pending", default)]
  pub pending:   Assignments,
  #[serde(rename = "Completed", default)]
  pub completed: Assignments,
  #[serde(rename = "Issue", default)]
  pub issues:    Assignments,
}

impl TaskLedger {
  pub fn category(&self, category: Category) -> &Assignments {
    match category {
      Category::Pending => &self.pending,
      Category::Completed => &self.completed,
      Category::Issue => &self.issues,
    }
  }

  pub fn category_mut(&mut self, category: Category) -> &mut Assignments {
    match category {
      Category::Pending => &mut self.pending,
      Category::Completed => &mut self.completed,
      Category::Issue => &mut self.issues,
    }
  }

  /// Append one task to an assignee's list in `category`.
  pub fn push(
    &mut self,
    category: Category,
    assignee: impl Into<String>,
    task: impl Into<String>,
  ) {
    self
      .category_mut(category)
      .entry(assignee.into())
      .or_default()
      .push(task.into());
  }

  pub fn is_empty(&self) -> bool {
    Category::ALL.iter().all(|c| self.category(*c).is_empty())
  }

  pub fn item_count(&self) -> usize {
    Category::ALL
      .iter()
      .map(|c| self.category(*c).values().map(Vec::len).sum::<usize>())
      .sum()
  }

  /// Flatten into `(category, assignee, position, task)` rows with 1-based
  /// positions per assignee list — the shape persisted as ledger items.
  pub fn rows(&self) -> Vec<(Category, &str, u32, &str)> {
    let mut rows = Vec::with_capacity(self.item_count());
    for category in Category::ALL {
      for (assignee, tasks) in self.category(category) {
        for (i, task) in tasks.iter().enumerate() {
          rows.push((category, assignee.as_str(), i as u32 + 1, task.as_str()));
        }
      }
    }
    rows
  }
}
