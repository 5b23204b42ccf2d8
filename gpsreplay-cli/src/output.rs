use std::io::Write;

use gpsreplay_logic::{Fix, FixSender, prelude::*};
use log::warn;
use tokio::sync::mpsc;

/// Forwards fixes from the simulator to the task printing them
pub struct ChannelSender(pub mpsc::UnboundedSender<Fix>);

impl FixSender for ChannelSender {
    fn send_fix(&self, fix: Fix) {
        if self.0.send(fix).is_err() {
            warn!("Output closed, dropping fix at {}", fix.timestamp);
        }
    }
}

/// Write a fix as a single line of JSON
pub fn write_fix(out: &mut impl Write, fix: &Fix) -> Result {
    serde_json::to_writer(&mut *out, fix).context("Failed to serialize fix")?;
    writeln!(out).context("Failed to write fix")?;
    Ok(())
}
