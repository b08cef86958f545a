//! Adaptive tick pacing and the world task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::util::time::Timer;

use super::snapshot::SnapshotStats;
use super::world::World;
use super::{Outbound, SessionEvent};

/// Ticks between periodic debug lines
const LOG_EVERY_TICKS: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// Target rate in Hz
    pub nominal_rate: f32,
    /// Rate with no clients, and the floor when overloaded
    pub idle_rate: f32,
    /// Rate change per tick while adapting
    pub step: f32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            nominal_rate: 30.0,
            idle_rate: 2.0,
            step: 0.5,
        }
    }
}

impl PacingConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            nominal_rate: config.tick_rate,
            idle_rate: config.idle_tick_rate.min(config.tick_rate),
            step: config.tick_rate_step,
        }
    }
}

/// Tracks the effective tick rate and the simulated time step for the next tick.
///
/// An overrun tick lowers the rate by one step and folds the overrun into the next step so
/// simulated time keeps up with wall time. Ticks with slack raise the rate back toward
/// nominal one step at a time.
#[derive(Debug, Clone)]
pub struct TickPacer {
    config: PacingConfig,
    rate: f32,
    delta_time: f32,
}

impl TickPacer {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            rate: config.nominal_rate,
            delta_time: 1.0 / config.nominal_rate,
            config,
        }
    }

    /// Current effective rate in Hz
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Seconds to simulate in the next tick
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Settle the rate after a tick that took `elapsed`; returns how long to sleep
    pub fn after_tick(&mut self, elapsed: Duration, clients: usize) -> Duration {
        let elapsed = elapsed.as_secs_f32();

        if clients == 0 {
            self.rate = self.config.idle_rate;
            self.delta_time = 1.0 / self.rate;
            return secs(self.delta_time - elapsed);
        }

        let slack = 1.0 / self.rate - elapsed;
        if slack < 0.0 {
            self.rate = (self.rate - self.config.step).max(self.config.idle_rate);
            self.delta_time = 1.0 / self.rate + slack.abs();
            warn!(
                overrun_ms = slack.abs() * 1000.0,
                rate = self.rate,
                "Tick overran its budget, slowing down"
            );
            return Duration::ZERO;
        }

        if self.rate < self.config.nominal_rate {
            self.rate = (self.rate + self.config.step).min(self.config.nominal_rate);
        }
        self.delta_time = 1.0 / self.rate;
        secs(slack)
    }
}

fn secs(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f32(value)
    } else {
        Duration::ZERO
    }
}

/// The world task: exclusive owner of `World` until `shutdown` fires.
///
/// Each iteration drains pending session events, runs one tick, then sleeps for whatever
/// slack the pacer grants.
pub async fn run_world(
    mut world: World,
    mut events: mpsc::Receiver<SessionEvent>,
    outbound: Arc<dyn Outbound>,
    mut pacer: TickPacer,
    shutdown: Arc<Notify>,
) -> World {
    info!(rate = pacer.rate(), "World loop started");
    let mut stats = SnapshotStats::default();
    let mut timer = Timer::new();

    loop {
        timer.reset();

        while let Ok(event) = events.try_recv() {
            world.apply_event(event, outbound.as_ref());
        }

        let report = world.tick(pacer.delta_time(), outbound.as_ref());
        stats.record(report.snapshots, report.update_bytes);

        if report.tick % LOG_EVERY_TICKS == 0 {
            debug!(
                tick = report.tick,
                rate = pacer.rate(),
                entities = world.entities().len(),
                clients = world.client_count(),
                avg_entities = stats.avg_entities_per_snapshot,
                avg_bytes = stats.avg_bytes(),
                tick_micros = timer.elapsed_micros(),
                "World status"
            );
            stats.reset();
        }

        let pause = pacer.after_tick(timer.elapsed(), world.client_count());

        tokio::select! {
            _ = shutdown.notified() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    info!(tick = world.tick_count(), "World loop stopped");
    world
}
