use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::platform::TableReader;
use crate::snapshot::Snapshot;

/// Periodically snapshots a probe's table and prints it.
pub struct PollingReporter {
    interval: Duration,
}

impl PollingReporter {
    pub fn new(interval: Duration) -> Self {
        PollingReporter { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn report<W: Write>(&self, snapshot: &Snapshot, out: &mut W) -> Result<()> {
        out.write_all(snapshot.render_line().as_bytes())
            .context("Failed to write report")?;
        out.flush().context("Failed to flush report")?;
        Ok(())
    }

    /// Runs until `cancellation` fires. A failed table read ends the loop
    /// with that error.
    pub async fn run<T: TableReader, W: Write>(
        &self,
        table: &T,
        out: &mut W,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("polling cancelled");
                    return Ok(());
                }
                _ = sleep(self.interval) => {}
            }

            let snapshot = table.read_table()?;
            if snapshot.is_empty() {
                debug!("no occurrences recorded yet");
            } else {
                debug!("read {} entries", snapshot.len());
            }
            self.report(&snapshot, out)?;
        }
    }
}
