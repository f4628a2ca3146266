//! Outbound event publication
//!
//! The detector publishes `MatchCreated` and `MatchEnded` exactly once per
//! state transition: only the call that won the conditional insert (or the
//! ACTIVE → ENDED transition) publishes.

use std::sync::Mutex;

use tracing::debug;
use types::events::OutboundEvent;
use types::ids::EventId;
use types::matching::Match;

/// Destination for outbound events
pub trait EventSink: Send + Sync {
    fn publish(&self, event: OutboundEvent);
}

/// Build the MatchCreated event for a freshly inserted match
pub fn match_created(record: &Match) -> OutboundEvent {
    OutboundEvent::MatchCreated {
        event_id: EventId::new(),
        match_id: record.id,
        user_low: record.user_low_id,
        user_high: record.user_high_id,
        matched_at: record.matched_at,
    }
}

/// Build the MatchEnded event for a match that just transitioned
///
/// Returns None for a match that is still active.
pub fn match_ended(record: &Match) -> Option<OutboundEvent> {
    Some(OutboundEvent::MatchEnded {
        event_id: EventId::new(),
        match_id: record.id,
        ended_by: record.ended_by?,
        ended_at: record.ended_at?,
    })
}

/// Sink that keeps every published event in memory
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of published events, in publication order
    pub fn events(&self) -> Vec<OutboundEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn created_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, OutboundEvent::MatchCreated { .. }))
            .count()
    }

    pub fn ended_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, OutboundEvent::MatchEnded { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: OutboundEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Sink that drops events, for deployments without downstream consumers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, event: OutboundEvent) {
        debug!(event_id = %event.event_id(), match_id = %event.match_id(), "Outbound event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::matching::CanonicalPair;

    #[test]
    fn test_match_ended_requires_transition() {
        let a = UserId::new();
        let mut record = Match::new(CanonicalPair::new(a, UserId::new()).unwrap(), 1);
        assert!(match_ended(&record).is_none());

        record.end(a, 2);
        match match_ended(&record) {
            Some(OutboundEvent::MatchEnded { ended_by, ended_at, .. }) => {
                assert_eq!(ended_by, a);
                assert_eq!(ended_at, 2);
            }
            other => panic!("Expected MatchEnded, got {:?}", other),
        }
    }

    #[test]
    fn test_recording_sink_counts() {
        let sink = RecordingSink::new();
        let record = Match::new(CanonicalPair::new(UserId::new(), UserId::new()).unwrap(), 1);
        sink.publish(match_created(&record));
        assert_eq!(sink.created_count(), 1);
        assert_eq!(sink.ended_count(), 0);
    }

    #[test]
    fn test_noop_sink_accepts_events() {
        let record = Match::new(CanonicalPair::new(UserId::new(), UserId::new()).unwrap(), 1);
        NoopSink.publish(match_created(&record));
    }
}
