//! Status conditions.
//!
//! Each combatant carries exactly one [`ConditionSet`]; token overlays and
//! other projections read from it rather than keeping their own copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed condition vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Bleeding,
    Blinded,
    Deafened,
    Fear,
    Fire,
    Grappled,
    Hidden,
    Pinned,
    Poisoned,
    Prone,
    Stunned,
    Unconscious,
    Dead,
}

impl Condition {
    pub fn id(&self) -> &'static str {
        match self {
            Condition::Bleeding => "bleeding",
            Condition::Blinded => "blinded",
            Condition::Deafened => "deafened",
            Condition::Fear => "fear",
            Condition::Fire => "fire",
            Condition::Grappled => "grappled",
            Condition::Hidden => "hidden",
            Condition::Pinned => "pinned",
            Condition::Poisoned => "poisoned",
            Condition::Prone => "prone",
            Condition::Stunned => "stunned",
            Condition::Unconscious => "unconscious",
            Condition::Dead => "dead",
        }
    }

    pub fn all() -> [Condition; 13] {
        [
            Condition::Bleeding,
            Condition::Blinded,
            Condition::Deafened,
            Condition::Fear,
            Condition::Fire,
            Condition::Grappled,
            Condition::Hidden,
            Condition::Pinned,
            Condition::Poisoned,
            Condition::Prone,
            Condition::Stunned,
            Condition::Unconscious,
            Condition::Dead,
        ]
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        Condition::all()
            .into_iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| format!("unknown condition: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Minor,
    Major,
}

/// Active conditions with their severity. At most one severity per id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSet {
    active: BTreeMap<Condition, Severity>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a condition, replacing any previous severity.
    /// Returns the severity it replaced.
    pub fn add(&mut self, condition: Condition, severity: Severity) -> Option<Severity> {
        self.active.insert(condition, severity)
    }

    pub fn remove(&mut self, condition: Condition) -> Option<Severity> {
        self.active.remove(&condition)
    }

    pub fn has(&self, condition: Condition) -> bool {
        self.active.contains_key(&condition)
    }

    pub fn severity(&self, condition: Condition) -> Option<Severity> {
        self.active.get(&condition).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Condition, Severity)> + '_ {
        self.active.iter().map(|(c, s)| (*c, *s))
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_severity_per_id() {
        let mut set = ConditionSet::new();
        assert_eq!(set.add(Condition::Stunned, Severity::Minor), None);
        assert_eq!(
            set.add(Condition::Stunned, Severity::Major),
            Some(Severity::Minor)
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.severity(Condition::Stunned), Some(Severity::Major));
    }

    #[test]
    fn test_remove() {
        let mut set = ConditionSet::new();
        set.add(Condition::Prone, Severity::Minor);
        assert!(set.has(Condition::Prone));
        assert_eq!(set.remove(Condition::Prone), Some(Severity::Minor));
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!("Blinded".parse::<Condition>(), Ok(Condition::Blinded));
        assert!("charmed".parse::<Condition>().is_err());
        for c in Condition::all() {
            assert_eq!(c.id().parse::<Condition>(), Ok(c));
        }
    }
}
