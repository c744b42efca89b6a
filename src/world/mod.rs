// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! World model - live positional model of every car and the spatial
//! relationships derived from it

mod car_state;
/// Closed-loop track geometry
pub mod kinematics;
mod model;
mod pair_state;
mod spatial_hash;

pub use car_state::CarState;
pub use kinematics::Side;
pub use model::{SpotterCall, TickReport, WorldModel};
pub use pair_state::{OverlapState, PairKey, PairOverlapState, PairStateMachine};
pub use spatial_hash::SpatialHash;
