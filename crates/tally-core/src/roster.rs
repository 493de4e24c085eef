//! Identity resolution against a fixed team roster.
//!
//! The roster is plain configuration data injected at construction — never a
//! module-level global — so tests and deployments can supply their own
//! member lists, identity tables, and alias spellings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Static identity data the resolver is built from.
///
/// `identities` maps opaque source-provided ids (e.g. `ou_…` open ids) to
/// display names. `aliases` maps known misspellings and nicknames to either a
/// roster member or one of the allowed non-person `buckets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
  /// Canonical member names. The ledger may only assign tasks to these
  /// names (or to a bucket).
  pub members:        Vec<String>,
  /// External id → display name. May include non-members (e.g. a bot
  /// account) so that transcript rendering shows something readable.
  #[serde(default)]
  pub identities:     HashMap<String, String>,
  /// Alias spelling → canonical member or bucket name.
  #[serde(default)]
  pub aliases:        HashMap<String, String>,
  /// Allowed non-person assignees, e.g. a shared "team" bucket.
  #[serde(default)]
  pub buckets:        Vec<String>,
  /// Prefix used for fallback labels of unmapped ids. Any free-text name
  /// starting with this prefix is treated as unresolvable.
  #[serde(default = "default_generic_prefix")]
  pub generic_prefix: String,
  /// Label used when an id is too short to derive a fallback suffix from.
  #[serde(default = "default_unknown_label")]
  pub unknown_label:  String,
}

fn default_generic_prefix() -> String { "user-".to_string() }
fn default_unknown_label() -> String { "unknown".to_string() }

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Pure identity resolver backed by a [`RosterConfig`].
///
/// All lookups are case- and whitespace-insensitive; returned names are
/// always the canonical spelling from the configuration.
#[derive(Debug, Clone)]
pub struct Roster {
  members:        Vec<String>,
  buckets:        Vec<String>,
  identities:     Vec<(String, String)>,
  members_index:  HashMap<String, String>,
  aliases_index:  HashMap<String, String>,
  buckets_index:  HashMap<String, String>,
  generic_prefix: String,
  unknown_label:  String,
}

/// Lookup key: trimmed and lowercased. Lowercasing is a no-op for CJK names
/// and folds Latin ones.
fn fold(name: &str) -> String { name.trim().to_lowercase() }

impl Roster {
  pub fn new(config: RosterConfig) -> Self {
    let members_index = config
      .members
      .iter()
      .map(|m| (fold(m), m.clone()))
      .collect();
    let aliases_index = config
      .aliases
      .iter()
      .map(|(alias, target)| (fold(alias), target.clone()))
      .collect();
    let buckets_index = config
      .buckets
      .iter()
      .map(|b| (fold(b), b.clone()))
      .collect();

    Self {
      members: config.members,
      buckets: config.buckets,
      identities: config.identities.into_iter().collect(),
      members_index,
      aliases_index,
      buckets_index,
      generic_prefix: config.generic_prefix,
      unknown_label: config.unknown_label,
    }
  }

  pub fn members(&self) -> &[String] { &self.members }

  pub fn buckets(&self) -> &[String] { &self.buckets }

  /// Map an external id to a display name.
  ///
  /// Unknown ids get a deterministic fallback label built from the last four
  /// characters of the id, so unresolved identities stay distinguishable
  /// downstream without ever failing the pipeline.
  pub fn resolve(&self, external_id: &str) -> String {
    if let Some((_, name)) =
      self.identities.iter().find(|(id, _)| id == external_id)
    {
      return name.clone();
    }

    let chars: Vec<char> = external_id.chars().collect();
    if chars.len() > 4 {
      let suffix: String = chars[chars.len() - 4..].iter().collect();
      format!("{}{}", self.generic_prefix, suffix)
    } else {
      self.unknown_label.clone()
    }
  }

  /// Map an arbitrary free-text name (model output, chat text) to the single
  /// canonical name it denotes, or `None` if it denotes no roster member.
  ///
  /// Fallback labels (anything starting with the generic prefix) never
  /// resolve — they mark identities the id table could not map.
  pub fn normalize(&self, name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.starts_with(&self.generic_prefix) {
      return None;
    }
    let key = fold(trimmed);
    self
      .members_index
      .get(&key)
      .or_else(|| self.aliases_index.get(&key))
      .cloned()
  }

  /// Strict membership check against the fixed roster. Aliases do not count.
  pub fn is_member(&self, name: &str) -> bool {
    self.members_index.contains_key(&fold(name))
  }

  /// Canonical spelling of an allowed non-person bucket, if `name` is one.
  pub fn bucket(&self, name: &str) -> Option<String> {
    self.buckets_index.get(&fold(name)).cloned()
  }

  pub fn is_bucket(&self, name: &str) -> bool { self.bucket(name).is_some() }

  /// Replace every literal occurrence of a known external id in `text` with
  /// its display name. Ids are assumed to be non-overlapping substrings, so
  /// replacement order does not matter.
  pub fn substitute_ids(&self, text: &str) -> String {
    let mut result = text.to_string();
    for (id, name) in &self.identities {
      if result.contains(id.as_str()) {
        result = result.replace(id.as_str(), name);
      }
    }
    result
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
