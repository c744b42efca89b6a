// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Session engine - one world model plus event fan-out

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::events::RaceEvent;
use crate::telemetry::TelemetrySnapshot;
use crate::world::{TickReport, WorldModel};

use super::{EngineStats, EventBus};

/// Drives a [`WorldModel`] tick by tick and publishes what it produces.
///
/// Single caller, sequential ticks; the engine holds no queue of its own.
pub struct Engine {
    /// Validated configuration shared with the world model
    pub config: Arc<Config>,
    world: WorldModel,
    event_bus: Arc<EventBus>,
    stats: EngineStats,
}

impl Engine {
    /// Build an engine with its own event bus
    pub fn new(config: Config) -> Result<Self> {
        let bus = Arc::new(EventBus::new(config.event_bus_capacity));
        Self::with_event_bus(config, bus)
    }

    /// Build an engine publishing onto an existing bus
    pub fn with_event_bus(config: Config, event_bus: Arc<EventBus>) -> Result<Self> {
        config.validate()?;
        let world = WorldModel::new(&config);

        info!(
            "Engine ready: {}m buckets, {}m overlap range, {} snapshot slots",
            config.world.bucket_size_meters,
            config.overlap.overlap_range_meters,
            config.snapshots.max_snapshots
        );

        Ok(Self {
            config: Arc::new(config),
            world,
            event_bus,
            stats: EngineStats::default(),
        })
    }

    /// Process one telemetry tick and publish its events
    pub fn process(&mut self, telemetry: &TelemetrySnapshot) -> TickReport {
        if let Some(last) = self.stats.last_tick_ms {
            let same_session = self.world.session_id() == Some(telemetry.session_id.as_str());
            if same_session && telemetry.session_time_ms < last {
                warn!(
                    "Tick at {}ms arrived after {}ms; ordering is the caller's responsibility",
                    telemetry.session_time_ms, last
                );
            }
        }

        let report = self.world.process_telemetry(telemetry);

        if report.session_changed {
            self.event_bus.publish_session_change(&telemetry.session_id);
        }
        for rejection in &report.rejected {
            self.event_bus.publish_rejection(rejection);
        }
        for event in &report.events {
            match event {
                RaceEvent::OverlapStateChanged(_) => self.stats.overlap_events += 1,
                RaceEvent::ThreeWideDetected(_) => self.stats.three_wide_events += 1,
            }
            self.event_bus.publish_race_event(event.clone());
        }

        self.stats.ticks_processed += 1;
        self.stats.cars_tracked = report.cars_tracked;
        self.stats.cars_rejected += report.rejected.len() as u64;
        self.stats.snapshots_stored = self.world.snapshots().len();
        self.stats.last_tick_ms = Some(report.timestamp);

        report
    }

    /// Underlying world model for queries
    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    /// Shared handle to the event bus
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Counters accumulated across ticks
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}
