use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::Timestamp;

/// Tri-state checkbox. A node without a checkbox holds `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkbox {
    Unchecked,
    Indeterminate,
    Checked,
}

impl Checkbox {
    /// Next state in the cycle `absent -> false -> indeterminate -> true -> absent`.
    pub fn cycle(state: Option<Checkbox>) -> Option<Checkbox> {
        match state {
            None => Some(Checkbox::Unchecked),
            Some(Checkbox::Unchecked) => Some(Checkbox::Indeterminate),
            Some(Checkbox::Indeterminate) => Some(Checkbox::Checked),
            Some(Checkbox::Checked) => None,
        }
    }

    pub fn is_done(self) -> bool {
        self == Checkbox::Checked
    }
}

impl fmt::Display for Checkbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkbox::Unchecked => f.write_str("false"),
            Checkbox::Indeterminate => f.write_str("indeterminate"),
            Checkbox::Checked => f.write_str("true"),
        }
    }
}

// On disk the state is `false`, `true` or the string "indeterminate".
impl Serialize for Checkbox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Checkbox::Unchecked => serializer.serialize_bool(false),
            Checkbox::Checked => serializer.serialize_bool(true),
            Checkbox::Indeterminate => serializer.serialize_str("indeterminate"),
        }
    }
}

impl<'de> Deserialize<'de> for Checkbox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Checkbox::Checked),
            Raw::Flag(false) => Ok(Checkbox::Unchecked),
            Raw::Word(word) if word == "indeterminate" => Ok(Checkbox::Indeterminate),
            Raw::Word(word) => Err(serde::de::Error::custom(format!(
                "invalid checkbox state: {word}"
            ))),
        }
    }
}

/// One `[timestamp, state]` entry of a node's checkbox history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxEntry(pub Timestamp, pub Option<Checkbox>);

impl CheckboxEntry {
    pub fn at(&self) -> Timestamp {
        self.0
    }

    pub fn state(&self) -> Option<Checkbox> {
        self.1
    }
}

/// Record a transition on a most-recent-first history log.
///
/// An entry younger than `debounce_ms` is replaced instead of kept, and a
/// transition to the state already at the head of the log adds nothing.
pub fn record_transition(
    log: &mut Vec<CheckboxEntry>,
    state: Option<Checkbox>,
    now: Timestamp,
    debounce_ms: i64,
) {
    if let Some(head) = log.first() {
        if now - head.at() < debounce_ms {
            log.remove(0);
        }
    }
    if log.first().map(|head| head.state()) == Some(state) {
        return;
    }
    log.insert(0, CheckboxEntry(now, state));
}
