// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event bus for handing engine output to external collaborators

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::TelemetryError;
use crate::events::RaceEvent;
use crate::telemetry::CarId;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// A pair engaged or disengaged
    OverlapStateChanged,
    /// Three cars side by side
    ThreeWideDetected,
    /// A car was dropped from a tick
    TelemetryRejected,
    /// A new session started
    SessionChanged,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic id assigned by the bus
    pub id: u64,
    /// Kind of event carried in the payload
    pub event_type: EventType,
    /// Wall-clock publish time; race events carry their own session time
    pub timestamp: DateTime<Utc>,
    /// Event data
    pub payload: EventPayload,
}

/// Data carried by an [`Event`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// Overlap or three-wide event
    Race(RaceEvent),
    /// A car sample that failed validation
    Rejected {
        /// Car dropped from the tick
        car: CarId,
        /// Validation failure message
        reason: String,
    },
    /// The session now being tracked
    Session {
        /// Id of the new session
        session_id: String,
    },
}

/// Central event bus for pub/sub communication.
///
/// Publishing never blocks and never fails; with no subscribers the event
/// is simply dropped.
pub struct EventBus {
    race_tx: broadcast::Sender<RaceEvent>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    /// Create a bus whose channels buffer `capacity` events each
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (race_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            race_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Publish on both the typed and the envelope channel
    pub fn publish_race_event(&self, event: RaceEvent) {
        let event_type = match &event {
            RaceEvent::OverlapStateChanged(_) => EventType::OverlapStateChanged,
            RaceEvent::ThreeWideDetected(_) => EventType::ThreeWideDetected,
        };
        let _ = self.race_tx.send(event.clone());
        self.publish_event(event_type, EventPayload::Race(event));
    }

    /// Publish a per-car validation failure
    pub fn publish_rejection(&self, error: &TelemetryError) {
        self.publish_event(
            EventType::TelemetryRejected,
            EventPayload::Rejected {
                car: error.car(),
                reason: error.to_string(),
            },
        );
    }

    /// Announce a session reset
    pub fn publish_session_change(&self, session_id: &str) {
        self.publish_event(
            EventType::SessionChanged,
            EventPayload::Session {
                session_id: session_id.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    /// Overlap and three-wide events only
    pub fn subscribe_race_events(&self) -> broadcast::Receiver<RaceEvent> {
        self.race_tx.subscribe()
    }

    /// Every envelope, including diagnostics
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Total envelopes published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
