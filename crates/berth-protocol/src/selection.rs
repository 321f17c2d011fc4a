//! Session selection
//!
//! The daemon only understands two ways of picking sessions: an explicit set of
//! identifiers, or a single label equality test.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::session::SessionId;

/// A `key == value` label test
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    /// Create a new label selector
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether a label set satisfies this selector
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.key, self.value)
    }
}

/// Which sessions an operation applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Exactly these sessions
    Identifiers(Vec<SessionId>),
    /// Every session whose labels match
    Labels(LabelSelector),
}

impl Selection {
    /// Whether the selection can match nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Identifiers(ids) if ids.is_empty())
    }
}

impl From<LabelSelector> for Selection {
    fn from(selector: LabelSelector) -> Self {
        Selection::Labels(selector)
    }
}

impl From<Vec<SessionId>> for Selection {
    fn from(ids: Vec<SessionId>) -> Self {
        Selection::Identifiers(ids)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Identifiers(ids) => {
                let ids: Vec<&str> = ids.iter().map(SessionId::as_str).collect();
                write!(f, "[{}]", ids.join(", "))
            }
            Selection::Labels(selector) => write!(f, "{}", selector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_selector_matches() {
        let selector = LabelSelector::new("sidecar-session-owner", "0123456789ab");
        let mut labels = BTreeMap::new();
        assert!(!selector.matches(&labels));

        labels.insert("sidecar-session-owner".to_string(), "ffffffffffff".to_string());
        assert!(!selector.matches(&labels));

        labels.insert("sidecar-session-owner".to_string(), "0123456789ab".to_string());
        assert!(selector.matches(&labels));
        assert_eq!(selector.to_string(), "sidecar-session-owner == 0123456789ab");
    }

    #[test]
    fn test_selection_wire_shape() {
        let selection = Selection::from(vec![SessionId::new("sync_1")]);
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(json, r#"{"identifiers":["sync_1"]}"#);
        assert!(!selection.is_empty());
        assert!(Selection::Identifiers(Vec::new()).is_empty());
    }
}
