use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::attachment::attach_probe;
use crate::config_manager::Config;
use crate::platform::{AttachedProbe, Platform};
use crate::probe::ProbeKind;
use crate::reporter::PollingReporter;

/// Attaches the configured probe and keeps it until `cancellation` fires or
/// reporting fails. The probe is detached on every path out of here.
pub async fn run_session<P: Platform, W: Write>(
    platform: &mut P,
    config: &Config,
    out: &mut W,
    cancellation: CancellationToken,
) -> Result<()> {
    let mut probe = attach_probe(platform, &config.event, config.probe)?;

    let outcome = match config.probe {
        ProbeKind::Count => {
            let reporter =
                PollingReporter::new(Duration::from_millis(config.polling_interval_ms));
            info!(
                "counting {} calls per user ID, reporting every {:?}",
                config.event,
                reporter.interval()
            );
            reporter.run(&probe, out, &cancellation).await
        }
        ProbeKind::Hello => {
            info!("tracing {}, press Ctrl-C to stop", config.event);
            cancellation.cancelled().await;
            Ok(())
        }
    };

    let detached = probe.detach();
    outcome?;
    detached?;
    Ok(())
}
