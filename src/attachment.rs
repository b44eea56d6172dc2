use log::info;

use crate::errors::ProbeError;
use crate::platform::{AttachedProbe, Platform};
use crate::probe::ProbeKind;

/// Resolves `event`, checks privileges and installs the probe selected by
/// `kind`. Nothing is loaded into the kernel unless resolution and the
/// privilege check both pass.
pub fn attach_probe<P: Platform>(
    platform: &mut P,
    event: &str,
    kind: ProbeKind,
) -> Result<P::Probe, ProbeError> {
    let handle = platform.resolve(event)?;
    info!("resolved {} to {}", handle.name(), handle.symbol());

    let artifact = kind.artifact();
    platform.ensure_privileges(&handle, &artifact)?;

    let probe = platform.attach(&handle, &artifact)?;
    info!(
        "{} probe active on {} ({})",
        kind,
        probe.target().symbol(),
        probe.program()
    );
    Ok(probe)
}
