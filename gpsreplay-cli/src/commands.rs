use std::{io::Write, path::Path, sync::Arc, time::Duration};

use anyhow::anyhow;
use chrono::TimeDelta;
use gpsreplay_logic::{
    Fix, PlaybackEngine, PlaybackSummary, ReplaySettings, Route, Simulator,
    geodesy::{geodesic_distance, initial_bearing, radians_to_degrees},
    prelude::*,
};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    ReplayArgs,
    output::{ChannelSender, write_fix},
};

fn load_route(path: &Path) -> Result<Route> {
    let route = gpsreplay_gpx::load_route(path)
        .with_context(|| format!("Failed to load route from {}", path.display()))?;
    info!("Loaded {} waypoints from {}", route.count(), path.display());
    Ok(route)
}

/// Resolves on Ctrl-C, or once `duration` has passed if given
async fn shutdown_signal(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(why) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {why}");
            std::future::pending::<()>().await;
        }
    };

    if let Some(duration) = duration {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = ctrl_c => {}
        }
    } else {
        ctrl_c.await;
    }
}

pub async fn play(args: &ReplayArgs, duration_secs: Option<u64>) -> Result {
    let route = load_route(&args.file)?;
    let settings = args.load_settings()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Fix>();
    let sim = Arc::new(Simulator::new(route, settings, ChannelSender(tx)));

    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(fix) = rx.recv().await {
            write_fix(&mut stdout, &fix)?;
            stdout.flush().context("Failed to flush output")?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let mut runner = {
        let sim = sim.clone();
        tokio::spawn(async move { sim.main_loop().await })
    };

    let summary: PlaybackSummary = tokio::select! {
        res = &mut runner => res.context("Replay task panicked")??,
        _ = shutdown_signal(duration_secs.map(Duration::from_secs)) => {
            info!("Stopping replay");
            sim.stop();
            runner.await.context("Replay task panicked")??
        }
    };

    // Last sender goes with the simulator, letting the printer drain and finish
    drop(sim);
    printer.await.context("Output task panicked")??;

    debug!("{summary:?}");

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub from: usize,
    pub to: usize,
    /// `None` when the solver could not find the distance
    pub distance_m: Option<f64>,
    pub duration_s: i64,
    pub bearing_deg: f64,
}

pub fn describe_route(route: &Route) -> Vec<SegmentReport> {
    route
        .segments()
        .map(|segment| {
            let distance_m = match geodesic_distance(&segment.from.position, &segment.to.position)
            {
                Ok(distance) => Some(distance),
                Err(why) => {
                    warn!("Segment {} -> {}: {why}", segment.index, segment.next);
                    None
                }
            };
            let bearing = initial_bearing(&segment.from.position, &segment.to.position);

            SegmentReport {
                from: segment.index,
                to: segment.next,
                distance_m,
                duration_s: segment.duration.num_seconds(),
                bearing_deg: radians_to_degrees(bearing).rem_euclid(360.0),
            }
        })
        .collect()
}

pub fn inspect(path: &Path) -> Result {
    let route = load_route(path)?;
    let reports = describe_route(&route);

    let total_m = reports.iter().filter_map(|r| r.distance_m).sum::<f64>();
    println!(
        "{} waypoints, {:.1} m per lap, {} s per lap",
        route.count(),
        total_m,
        route.cycle_duration().num_seconds()
    );

    for (waypoint, report) in route.iter().zip(reports.iter()) {
        let distance = report
            .distance_m
            .map(|d| format!("{d:.1} m"))
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "#{:<4} {} at {}  ->  #{:<4} {distance}, {} s, bearing {:.1}",
            report.from,
            waypoint.position,
            waypoint.timestamp,
            report.to,
            report.duration_s,
            report.bearing_deg
        );
    }

    Ok(())
}

/// Tick an engine from the first waypoint's timestamp for `seconds`, collecting every fix
pub fn run_simulation(route: Route, settings: ReplaySettings, seconds: u64) -> Result<Vec<Fix>> {
    let start = route
        .get(0)
        .map_err(|_| anyhow!("Route has no waypoints"))?
        .timestamp;
    let step = i64::try_from(settings.tick_interval_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or_else(|| anyhow!("Tick interval of {} ms is too long", settings.tick_interval_ms))?;
    let end = i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or_else(|| anyhow!("Cannot simulate {seconds} s from {start}"))?;

    let mut engine = PlaybackEngine::new(route, settings);
    let mut fixes = Vec::new();
    let mut now = start;

    while now <= end {
        match engine.tick(now) {
            Ok(Some(fix)) => fixes.push(fix),
            Ok(None) => debug!("Crossed into {:?} at {now}", engine.phase()),
            Err(why) => warn!("Skipping tick at {now}: {why}"),
        }
        now = match now.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(fixes)
}

pub fn simulate(args: &ReplayArgs, seconds: u64) -> Result {
    let route = load_route(&args.file)?;
    let settings = args.load_settings()?;

    let fixes = run_simulation(route, settings, seconds)?;

    let mut stdout = std::io::stdout().lock();
    for fix in fixes.iter() {
        write_fix(&mut stdout, fix)?;
    }

    info!("Simulated {seconds} s, {} fixes", fixes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use gpsreplay_logic::{AdvanceMode, GeoPoint, Waypoint};

    use super::*;

    fn equator_route() -> Route {
        let t0 = Utc.with_ymd_and_hms(2015, 9, 15, 12, 0, 0).unwrap();
        [(0.0, 0), (1.0, 100)]
            .into_iter()
            .map(|(lon, offset)| {
                Waypoint::new(
                    GeoPoint::new(0.0, lon).unwrap(),
                    t0 + TimeDelta::seconds(offset),
                )
            })
            .collect()
    }

    #[test]
    fn test_describe_route() {
        let reports = describe_route(&equator_route());

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].from, 0);
        assert_eq!(reports[0].to, 1);
        assert_eq!(reports[0].duration_s, 100);
        assert!((reports[0].distance_m.unwrap() - 111_319.49).abs() < 0.01);
        assert!((reports[0].bearing_deg - 90.0).abs() < 1e-9);

        assert_eq!(reports[1].to, 0, "Closing segment loops back");
        assert_eq!(reports[1].duration_s, -100);
        assert!((reports[1].bearing_deg - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_simulation() {
        let settings = ReplaySettings {
            tick_interval_ms: 1000,
            ..Default::default()
        };
        let fixes = run_simulation(equator_route(), settings, 50).expect("Simulation failed");

        assert_eq!(fixes.len(), 51, "One fix per simulated second, both ends included");
        assert_eq!(fixes[0].lon, 0.0);
        let last = fixes.last().unwrap();
        assert!((last.lon - 0.5).abs() < 1e-6, "Expected lon 0.5, got {}", last.lon);
    }

    #[test]
    fn test_run_simulation_crosses_waypoints() {
        let settings = ReplaySettings {
            tick_interval_ms: 1000,
            ..Default::default()
        };
        let fixes = run_simulation(equator_route(), settings.clone(), 150).expect("Failed");
        // Tick at 101 s crosses, 102 s crosses the closing leg, then we restart
        assert_eq!(fixes.len(), 149);

        let settings = ReplaySettings {
            advance: AdvanceMode::CatchUp,
            ..settings
        };
        let fixes = run_simulation(equator_route(), settings, 150).expect("Failed");
        assert_eq!(fixes.len(), 151, "Catch up emits on every tick");
    }

    #[test]
    fn test_run_simulation_too_long() {
        let res = run_simulation(equator_route(), ReplaySettings::default(), u64::MAX / 2);
        assert!(res.is_err(), "Simulating past the end of time should fail");

        let res = run_simulation(equator_route(), ReplaySettings::default(), u64::MAX);
        assert!(res.is_err());
    }

    #[test]
    fn test_run_simulation_empty_route() {
        assert!(run_simulation(Route::new(), ReplaySettings::default(), 10).is_err());
    }
}
