//! User attributes consumed from the external user directory
//!
//! The engine never writes these; it reads them to build and score feeds.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Gender as published by the user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

/// What a user is looking for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub min_age: u8,
    pub max_age: u8,
    /// Genders this user wants to see. Empty means no restriction.
    pub interested_in: BTreeSet<Gender>,
}

impl Preferences {
    pub fn admits_age(&self, age: u8) -> bool {
        age >= self.min_age && age <= self.max_age
    }

    pub fn admits_gender(&self, gender: Gender) -> bool {
        self.interested_in.is_empty() || self.interested_in.contains(&gender)
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            min_age: 18,
            max_age: 99,
            interested_in: BTreeSet::new(),
        }
    }
}

/// Attributes needed for scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub age: u8,
    pub gender: Gender,
    pub interests: BTreeSet<String>,
    pub preferences: Preferences,
    /// Account creation (Unix nanos)
    pub created_at: i64,
    /// Last activity (Unix nanos), used for tie-breaking
    pub last_active_at: i64,
}

impl UserProfile {
    /// Interests normalized for comparison (trimmed, lowercase, non-empty)
    pub fn normalized_interests(&self) -> BTreeSet<String> {
        self.interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_gender_preference_admits_all() {
        let prefs = Preferences::default();
        assert!(prefs.admits_gender(Gender::Male));
        assert!(prefs.admits_gender(Gender::NonBinary));
    }

    #[test]
    fn test_age_bounds_inclusive() {
        let prefs = Preferences {
            min_age: 25,
            max_age: 35,
            interested_in: BTreeSet::new(),
        };
        assert!(prefs.admits_age(25));
        assert!(prefs.admits_age(35));
        assert!(!prefs.admits_age(36));
    }

    #[test]
    fn test_normalized_interests() {
        let profile = UserProfile {
            user_id: UserId::new(),
            age: 30,
            gender: Gender::Female,
            interests: ["  Hiking", "hiking", "Jazz ", ""]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            preferences: Preferences::default(),
            created_at: 0,
            last_active_at: 0,
        };
        let normalized = profile.normalized_interests();
        assert_eq!(normalized.len(), 2);
        assert!(normalized.contains("hiking"));
        assert!(normalized.contains("jazz"));
    }
}
