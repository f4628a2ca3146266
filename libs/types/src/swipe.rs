//! Swipe types
//!
//! A swipe is a unilateral signal from an actor toward a target. At most
//! one swipe exists per (actor, target); a later swipe overwrites it.

use crate::errors::ValidationError;
use crate::ids::{SwipeId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Swipe action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwipeAction {
    Like,
    Pass,
    SuperLike,
}

impl SwipeAction {
    /// Positive actions are the ones that can complete a match
    pub fn is_positive(&self) -> bool {
        matches!(self, SwipeAction::Like | SwipeAction::SuperLike)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Like => "LIKE",
            SwipeAction::Pass => "PASS",
            SwipeAction::SuperLike => "SUPER_LIKE",
        }
    }
}

impl FromStr for SwipeAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LIKE" => Ok(SwipeAction::Like),
            "PASS" => Ok(SwipeAction::Pass),
            "SUPER_LIKE" | "SUPERLIKE" => Ok(SwipeAction::SuperLike),
            _ => Err(ValidationError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted swipe record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    pub id: SwipeId,
    pub actor_id: UserId,
    pub target_id: UserId,
    pub action: SwipeAction,
    /// Unix nanos of the latest action change
    pub created_at: i64,
}

impl Swipe {
    /// Build a swipe after validating the actor/target pair
    pub fn new(
        actor_id: UserId,
        target_id: UserId,
        action: SwipeAction,
        created_at: i64,
    ) -> Result<Self, ValidationError> {
        validate_pair(actor_id, target_id)?;
        Ok(Self {
            id: SwipeId::new(),
            actor_id,
            target_id,
            action,
            created_at,
        })
    }
}

/// Reject self-swipes
pub fn validate_pair(actor_id: UserId, target_id: UserId) -> Result<(), ValidationError> {
    if actor_id == target_id {
        return Err(ValidationError::SelfSwipe {
            user_id: actor_id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!("LIKE".parse::<SwipeAction>().unwrap(), SwipeAction::Like);
        assert_eq!("pass".parse::<SwipeAction>().unwrap(), SwipeAction::Pass);
        assert_eq!(
            "SUPER_LIKE".parse::<SwipeAction>().unwrap(),
            SwipeAction::SuperLike
        );
    }

    #[test]
    fn test_parse_unknown_action() {
        let err = "MAYBE".parse::<SwipeAction>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidAction("MAYBE".to_string()));
    }

    #[test]
    fn test_positive_actions() {
        assert!(SwipeAction::Like.is_positive());
        assert!(SwipeAction::SuperLike.is_positive());
        assert!(!SwipeAction::Pass.is_positive());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&SwipeAction::SuperLike).unwrap();
        assert_eq!(json, "\"SUPER_LIKE\"");
    }

    #[test]
    fn test_self_swipe_rejected() {
        let user = UserId::new();
        let err = Swipe::new(user, user, SwipeAction::Like, 1).unwrap_err();
        assert!(matches!(err, ValidationError::SelfSwipe { .. }));
    }
}
