// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Telemetry input - one snapshot of every car per simulation tick

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

/// Session time in milliseconds
pub type TimestampMs = u64;

/// Stable car identifier, unique within a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarId(pub u32);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for CarId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Planar velocity as reported by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Longitudinal component
    pub x: f64,
    /// Lateral component
    pub y: f64,
}

/// Raw per-car sample. Every field that can be absent in the feed is optional
/// so malformed cars can be rejected individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarTelemetry {
    /// Car the sample describes
    pub car_id: CarId,

    /// Normalized lap position, 0 at start/finish
    #[serde(default)]
    pub lap_dist_pct: Option<f64>,

    /// Velocity in m/s
    #[serde(default)]
    pub velocity: Option<Velocity>,

    /// Lateral position, -1 (left edge) to 1 (right edge)
    #[serde(default)]
    pub lane_offset: Option<f64>,

    /// Speed in m/s, informational only
    #[serde(default)]
    pub speed: Option<f64>,

    /// Car is on pit road
    #[serde(default)]
    pub in_pit: bool,
}

/// A full telemetry tick for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Session the tick belongs to
    pub session_id: String,

    /// Relays send fractional milliseconds; they are truncated
    #[serde(deserialize_with = "millis_from_number")]
    pub session_time_ms: TimestampMs,

    /// Track length in meters; absent or non-positive means "unknown"
    #[serde(default)]
    pub track_length_meters: Option<f64>,

    /// One sample per car
    pub cars: Vec<CarTelemetry>,
}

impl TelemetrySnapshot {
    /// Empty tick for a session
    pub fn new(session_id: impl Into<String>, session_time_ms: TimestampMs) -> Self {
        Self {
            session_id: session_id.into(),
            session_time_ms,
            track_length_meters: None,
            cars: Vec::new(),
        }
    }

    /// Set the reported track length
    pub fn with_track_length(mut self, meters: f64) -> Self {
        self.track_length_meters = Some(meters);
        self
    }

    /// Append a car on the racing line with a nominal forward velocity
    pub fn with_car(mut self, id: u32, lap_dist_pct: f64, lane_offset: f64) -> Self {
        self.cars.push(CarTelemetry {
            car_id: CarId(id),
            lap_dist_pct: Some(lap_dist_pct),
            velocity: Some(Velocity { x: 50.0, y: 0.0 }),
            lane_offset: Some(lane_offset),
            speed: Some(50.0),
            in_pit: false,
        });
        self
    }

    /// Append a car sample
    pub fn push(&mut self, car: CarTelemetry) {
        self.cars.push(car);
    }

    /// Parse one JSON telemetry message
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

fn millis_from_number<'de, D>(deserializer: D) -> Result<TimestampMs, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(de::Error::custom(format!("invalid session time {raw}")));
    }
    Ok(raw as TimestampMs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relay_message() {
        let json = r#"{
            "sessionId": "mock-session-123",
            "sessionTimeMs": 1000,
            "trackLengthMeters": 5891.0,
            "cars": [
                {"carId": 1, "lapDistPct": 0.25, "velocity": {"x": 60.0, "y": 1.5}, "inPit": false},
                {"carId": 2, "lapDistPct": 0.20}
            ]
        }"#;

        let snapshot = TelemetrySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.session_id, "mock-session-123");
        assert_eq!(snapshot.session_time_ms, 1000);
        assert_eq!(snapshot.track_length_meters, Some(5891.0));
        assert_eq!(snapshot.cars.len(), 2);
        assert_eq!(snapshot.cars[0].car_id, CarId(1));
        assert_eq!(snapshot.cars[0].velocity, Some(Velocity { x: 60.0, y: 1.5 }));
        assert!(snapshot.cars[1].velocity.is_none());
        assert!(snapshot.cars[1].lane_offset.is_none());
        assert!(!snapshot.cars[1].in_pit);
    }

    #[test]
    fn test_fractional_session_time() {
        let json = r#"{"sessionId": "s", "sessionTimeMs": 1712.75, "cars": []}"#;
        let snapshot = TelemetrySnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.session_time_ms, 1712);

        let json = r#"{"sessionId": "s", "sessionTimeMs": -5, "cars": []}"#;
        assert!(TelemetrySnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_builder() {
        let snapshot = TelemetrySnapshot::new("s", 10)
            .with_track_length(4000.0)
            .with_car(7, 0.5, -0.3);

        assert_eq!(snapshot.cars.len(), 1);
        assert_eq!(snapshot.cars[0].car_id, CarId(7));
        assert_eq!(snapshot.cars[0].lane_offset, Some(-0.3));
    }
}
