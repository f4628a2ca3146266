//! Cross-service event definitions
//!
//! Inbound events are published by other services (user directory, chat)
//! with at-least-once delivery and no ordering guarantee. Outbound events
//! are published by the match engine exactly once per state transition.

use crate::ids::{EventId, MatchId, UserId};
use serde::{Deserialize, Serialize};

/// Envelope for events consumed by the consistency listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Unique per logical event; redeliveries reuse it
    pub event_id: EventId,
    /// Producer timestamp (Unix nanos)
    pub occurred_at: i64,
    pub payload: InboundPayload,
}

/// Inbound event payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum InboundPayload {
    UserUpdated {
        user_id: UserId,
    },
    UserDeleted {
        user_id: UserId,
    },
    MatchCreated {
        match_id: MatchId,
        user_low: UserId,
        user_high: UserId,
    },
    MatchEnded {
        match_id: MatchId,
    },
}

impl InboundEvent {
    pub fn new(payload: InboundPayload, occurred_at: i64) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at,
            payload,
        }
    }

    /// Users whose cached state this event touches
    pub fn affected_users(&self) -> Vec<UserId> {
        match &self.payload {
            InboundPayload::UserUpdated { user_id } | InboundPayload::UserDeleted { user_id } => {
                vec![*user_id]
            }
            InboundPayload::MatchCreated {
                user_low, user_high, ..
            } => vec![*user_low, *user_high],
            InboundPayload::MatchEnded { .. } => Vec::new(),
        }
    }

    /// Event type label for logging
    pub fn event_type_label(&self) -> &'static str {
        match &self.payload {
            InboundPayload::UserUpdated { .. } => "UserUpdated",
            InboundPayload::UserDeleted { .. } => "UserDeleted",
            InboundPayload::MatchCreated { .. } => "MatchCreated",
            InboundPayload::MatchEnded { .. } => "MatchEnded",
        }
    }
}

/// Events published by the match engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum OutboundEvent {
    MatchCreated {
        event_id: EventId,
        match_id: MatchId,
        user_low: UserId,
        user_high: UserId,
        matched_at: i64,
    },
    MatchEnded {
        event_id: EventId,
        match_id: MatchId,
        ended_by: UserId,
        ended_at: i64,
    },
}

impl OutboundEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            OutboundEvent::MatchCreated { event_id, .. }
            | OutboundEvent::MatchEnded { event_id, .. } => *event_id,
        }
    }

    pub fn match_id(&self) -> MatchId {
        match self {
            OutboundEvent::MatchCreated { match_id, .. }
            | OutboundEvent::MatchEnded { match_id, .. } => *match_id,
        }
    }

    /// Re-shape as an inbound event so the engine's own listener can react
    /// to transitions it published.
    pub fn to_inbound(&self) -> InboundEvent {
        match self {
            OutboundEvent::MatchCreated {
                event_id,
                match_id,
                user_low,
                user_high,
                matched_at,
            } => InboundEvent {
                event_id: *event_id,
                occurred_at: *matched_at,
                payload: InboundPayload::MatchCreated {
                    match_id: *match_id,
                    user_low: *user_low,
                    user_high: *user_high,
                },
            },
            OutboundEvent::MatchEnded {
                event_id,
                match_id,
                ended_at,
                ..
            } => InboundEvent {
                event_id: *event_id,
                occurred_at: *ended_at,
                payload: InboundPayload::MatchEnded {
                    match_id: *match_id,
                },
            },
        }
    }
}
