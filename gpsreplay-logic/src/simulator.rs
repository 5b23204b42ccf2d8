use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, MutexGuard},
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

use crate::{
    UtcDT, location::Fix, playback::PlaybackEngine, prelude::*, route::Route,
    settings::ReplaySettings,
};

/// Receives every fix the simulator emits
pub trait FixSender {
    fn send_fix(&self, fix: Fix);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Tally of what happened over the lifetime of a [Simulator::main_loop]
pub struct PlaybackSummary {
    /// Fixes handed to the [FixSender]
    pub fixes: u64,
    /// Ticks spent crossing a waypoint
    pub waypoints_crossed: u64,
    /// Ticks that failed and were skipped
    pub failed_ticks: u64,
}

/// Drives a [PlaybackEngine] on a fixed interval, forwarding fixes to a [FixSender] until
/// [Simulator::stop] is called.
pub struct Simulator<S: FixSender> {
    engine: Mutex<PlaybackEngine>,
    sender: S,
    interval: Duration,
    cancel: CancellationToken,
}

impl<S: FixSender> Simulator<S> {
    pub fn new(route: Route, settings: ReplaySettings, sender: S) -> Self {
        let interval = settings.tick_interval();
        Self {
            engine: Mutex::new(PlaybackEngine::new(route, settings)),
            sender,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the main loop, it finishes the tick it is on (if any) and returns
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn latest_fix(&self) -> Option<Fix> {
        self.engine.lock().await.last_fix().copied()
    }

    pub async fn lock_engine(&self) -> MutexGuard<'_, PlaybackEngine> {
        self.engine.lock().await
    }

    /// Perform a tick for a specific moment in time
    fn tick(&self, engine: &mut PlaybackEngine, now: UtcDT, summary: &mut PlaybackSummary) {
        match engine.tick(now) {
            Ok(Some(fix)) => {
                summary.fixes += 1;
                self.sender.send_fix(fix);
            }
            Ok(None) => {
                summary.waypoints_crossed += 1;
                debug!("Crossed into segment {:?}", engine.phase());
            }
            Err(why) => {
                summary.failed_ticks += 1;
                warn!("Skipping tick at {now}: {why}");
            }
        }
    }

    #[cfg(test)]
    fn get_now() -> UtcDT {
        let fake = tokio::time::Instant::now();
        let real = std::time::Instant::now();
        Utc::now() + (fake.into_std().duration_since(real) + Duration::from_secs(1))
    }

    #[cfg(not(test))]
    fn get_now() -> UtcDT {
        Utc::now()
    }

    /// Main loop of the simulator, ticks the engine every interval until stopped.
    pub async fn main_loop(&self) -> Result<PlaybackSummary> {
        let waypoints = {
            let engine = self.engine.lock().await;
            engine
                .settings()
                .validate()
                .context("Invalid replay settings")?;
            engine.route().count()
        };
        if waypoints == 0 {
            bail!("Refusing to replay a route with no waypoints");
        }

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = PlaybackSummary::default();

        info!(
            "Replaying {waypoints} waypoints, ticking every {}ms",
            self.interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    let mut engine = self.engine.lock().await;
                    self.tick(&mut engine, Self::get_now(), &mut summary);
                }
            }
        }

        info!(
            "Replay stopped after {} fixes, {} waypoints crossed, {} failed ticks",
            summary.fixes, summary.waypoints_crossed, summary.failed_ticks
        );

        Ok(summary)
    }
}
