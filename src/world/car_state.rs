// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Live per-car state, rebuilt from telemetry every tick

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::telemetry::{CarId, CarTelemetry};

/// Validated position and motion of one car for the current tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarState {
    /// Car id
    pub id: CarId,
    /// Normalized lap position in `[0, 1)`
    pub lap_dist_pct: f64,
    /// Track length in effect for this tick
    pub track_length_meters: f64,
    /// Velocity in m/s
    pub velocity: Vector2<f64>,
    /// Fixed placeholder, not derived from telemetry
    pub track_width: f64,
    /// Lateral position, 0 = centerline. Defaults to 0 when the feed has none.
    pub lane_offset: f64,
    /// Car is on pit road
    pub in_pit: bool,
}

impl CarState {
    /// Validate a raw sample. Any missing or non-finite required field
    /// rejects the whole car for this tick.
    pub fn from_telemetry(
        sample: &CarTelemetry,
        track_length_meters: f64,
        track_width: f64,
    ) -> Result<Self, TelemetryError> {
        let car = sample.car_id;

        let pct = sample
            .lap_dist_pct
            .ok_or(TelemetryError::MissingPosition(car))?;
        if !pct.is_finite() {
            return Err(TelemetryError::NonFinitePosition { car, value: pct });
        }
        if !(0.0..=1.0).contains(&pct) {
            return Err(TelemetryError::PositionOutOfRange { car, value: pct });
        }

        let velocity = sample.velocity.ok_or(TelemetryError::MissingVelocity(car))?;
        if !velocity.x.is_finite() || !velocity.y.is_finite() {
            return Err(TelemetryError::NonFiniteVelocity {
                car,
                x: velocity.x,
                y: velocity.y,
            });
        }

        let lane_offset = sample.lane_offset.unwrap_or(0.0);
        if !lane_offset.is_finite() {
            return Err(TelemetryError::NonFiniteLaneOffset {
                car,
                value: lane_offset,
            });
        }

        Ok(Self {
            id: car,
            // 1.0 is the start/finish line seen from the other side
            lap_dist_pct: if pct >= 1.0 { 0.0 } else { pct },
            track_length_meters,
            velocity: Vector2::new(velocity.x, velocity.y),
            track_width,
            lane_offset: lane_offset.clamp(-1.0, 1.0),
            in_pit: sample.in_pit,
        })
    }

    /// Distance from start/finish in meters
    pub fn lap_distance_meters(&self) -> f64 {
        self.lap_dist_pct * self.track_length_meters
    }

    /// Velocity magnitude in m/s
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    #[cfg(test)]
    pub(crate) fn for_test(id: u32, lap_dist_pct: f64, lane_offset: f64, track_length: f64) -> Self {
        Self {
            id: CarId(id),
            lap_dist_pct,
            track_length_meters: track_length,
            velocity: Vector2::new(50.0, 0.0),
            track_width: 12.0,
            lane_offset,
            in_pit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Velocity;

    fn sample(pct: Option<f64>, velocity: Option<Velocity>) -> CarTelemetry {
        CarTelemetry {
            car_id: CarId(3),
            lap_dist_pct: pct,
            velocity,
            ..Default::default()
        }
    }

    const V: Velocity = Velocity { x: 3.0, y: 4.0 };

    #[test]
    fn test_valid_sample() {
        let state = CarState::from_telemetry(&sample(Some(0.25), Some(V)), 4000.0, 12.0).unwrap();
        assert_eq!(state.id, CarId(3));
        assert_eq!(state.lane_offset, 0.0);
        assert!((state.lap_distance_meters() - 1000.0).abs() < 1e-9);
        assert!((state.speed() - 5.0).abs() < 1e-9);
        assert_eq!(state.track_width, 12.0);
    }

    #[test]
    fn test_full_lap_wraps_to_zero() {
        let state = CarState::from_telemetry(&sample(Some(1.0), Some(V)), 4000.0, 12.0).unwrap();
        assert_eq!(state.lap_dist_pct, 0.0);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            CarState::from_telemetry(&sample(None, Some(V)), 4000.0, 12.0),
            Err(TelemetryError::MissingPosition(CarId(3)))
        );
        assert!(matches!(
            CarState::from_telemetry(&sample(Some(f64::NAN), Some(V)), 4000.0, 12.0),
            Err(TelemetryError::NonFinitePosition { .. })
        ));
        assert!(matches!(
            CarState::from_telemetry(&sample(Some(-1.0), Some(V)), 4000.0, 12.0),
            Err(TelemetryError::PositionOutOfRange { .. })
        ));
        assert_eq!(
            CarState::from_telemetry(&sample(Some(0.5), None), 4000.0, 12.0),
            Err(TelemetryError::MissingVelocity(CarId(3)))
        );

        let bad_velocity = Velocity { x: f64::INFINITY, y: 0.0 };
        let err = CarState::from_telemetry(&sample(Some(0.5), Some(bad_velocity)), 4000.0, 12.0)
            .unwrap_err();
        assert_eq!(err.car(), CarId(3));
    }
}
