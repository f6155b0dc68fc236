//! Moderation gate: a replaceable admission predicate.
//!
//! Text mentioning an allow-listed topic is always admitted. Otherwise it is
//! blocked only when it names both a violent act and a real person; either
//! term alone passes, which keeps fictional and game talk admissible.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_ALLOW_TERMS: &[&str] = &[
    r"elden\s*ring",
    r"fire\s*giant",
    "boss",
    "raid",
    "dungeon",
    "build",
    "loadout",
    "soulslike",
    r"dark\s*souls",
    "monster hunter",
    "boss fight",
    "strategy",
    "guide",
];

const DEFAULT_VIOLENCE_TERMS: &[&str] = &[
    "kill", "murder", "shoot", "stab", "strangle", "poison", "bomb", "maim", "beat up", "assault",
];

const DEFAULT_PERSON_TERMS: &[&str] = &[
    "me",
    "myself",
    "him",
    "her",
    "them",
    "teacher",
    "neighbor",
    "classmate",
    "coworker",
    "someone",
    "a person",
    "people",
];

/// Term lists for the gate. Entries are regex fragments matched as whole
/// words, case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationPolicy {
    #[serde(default)]
    pub allow_terms: Vec<String>,
    pub violence_terms: Vec<String>,
    pub person_terms: Vec<String>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect();
        Self {
            allow_terms: owned(DEFAULT_ALLOW_TERMS),
            violence_terms: owned(DEFAULT_VIOLENCE_TERMS),
            person_terms: owned(DEFAULT_PERSON_TERMS),
        }
    }
}

impl ModerationPolicy {
    /// Load a policy from a TOML file with `allow_terms`, `violence_terms`
    /// and `person_terms` arrays.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read moderation policy {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("bad moderation policy {}: {e}", path.display()))
        })
    }
}

/// Compiled moderation predicate.
#[derive(Debug, Clone)]
pub struct ModerationGate {
    allow: Option<Regex>,
    violence: Option<Regex>,
    person: Option<Regex>,
}

impl ModerationGate {
    pub fn new(policy: &ModerationPolicy) -> Result<Self> {
        Ok(Self {
            allow: compile_terms(&policy.allow_terms)?,
            violence: compile_terms(&policy.violence_terms)?,
            person: compile_terms(&policy.person_terms)?,
        })
    }

    /// Should this text be rejected outright?
    pub fn should_block(&self, text: &str) -> bool {
        let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(text));
        if matches(&self.allow) {
            return false;
        }
        matches(&self.violence) && matches(&self.person)
    }
}

fn compile_terms(terms: &[String]) -> Result<Option<Regex>> {
    if terms.is_empty() {
        return Ok(None);
    }
    let pattern = pattern_for(terms.iter().map(String::as_str));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| Error::Config(format!("bad moderation term: {e}")))
}

fn pattern_for<'a>(terms: impl Iterator<Item = &'a str>) -> String {
    let alternation = terms.collect::<Vec<_>>().join("|");
    format!(r"(?i)\b(?:{alternation})\b")
}
