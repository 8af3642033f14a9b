use serde::{Deserialize, Serialize};

use super::{TagId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagHistory {
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Colour hue in degrees, `0..360`.
    pub hue: f64,
    pub history: TagHistory,
}

impl Tag {
    /// Create a new tag
    pub fn new(name: &str, hue: f64, now: Timestamp) -> Self {
        Self {
            id: TagId::generate(),
            name: Self::normalize_name(name),
            hue: Self::normalize_hue(hue),
            history: TagHistory {
                created_time: now,
                last_modified_time: now,
            },
        }
    }

    /// Normalize tag name (trim whitespace, drop a leading '#')
    pub fn normalize_name(name: &str) -> String {
        name.trim().trim_start_matches('#').trim().to_string()
    }

    /// Validate tag name
    pub fn is_valid_name(name: &str) -> bool {
        let normalized = Self::normalize_name(name);
        !normalized.is_empty() && normalized.len() <= 100 && !normalized.contains('\n')
    }

    /// Wrap any hue into `0..360`.
    pub fn normalize_hue(hue: f64) -> f64 {
        if hue.is_finite() {
            hue.rem_euclid(360.0)
        } else {
            0.0
        }
    }

    pub fn rename(&mut self, name: &str, now: Timestamp) {
        self.name = Self::normalize_name(name);
        self.history.last_modified_time = self.history.last_modified_time.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_creation() {
        let tag = Tag::new(" #work ", 400.0, 7);
        assert_eq!(tag.name, "work");
        assert_eq!(tag.hue, 40.0);
        assert_eq!(tag.history.created_time, 7);
    }

    #[test]
    fn test_is_valid_name() {
        assert!(Tag::is_valid_name("work"));
        assert!(Tag::is_valid_name("  work  "));
        assert!(!Tag::is_valid_name(""));
        assert!(!Tag::is_valid_name("   "));
        assert!(!Tag::is_valid_name("#"));
    }

    #[test]
    fn test_negative_hue_wraps() {
        assert_eq!(Tag::normalize_hue(-30.0), 330.0);
        assert_eq!(Tag::normalize_hue(f64::NAN), 0.0);
    }
}
