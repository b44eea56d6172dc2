#[cfg(test)]
pub mod simulated;

use crate::errors::ProbeError;
use crate::probe::ProbeArtifact;
use crate::snapshot::Snapshot;

/// A kernel event resolved from its human-readable name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventHandle {
    name: String,
    symbol: String,
}

impl EventHandle {
    pub fn new(name: &str, symbol: &str) -> Self {
        EventHandle {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kernel entry symbol the probe is attached to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

pub trait TableReader {
    /// Copies the accumulator table. Never mutates it.
    fn read_table(&self) -> Result<Snapshot, ProbeError>;
}

/// A probe installed on a kernel event. Detaching is idempotent; after it the
/// table can no longer be read.
pub trait AttachedProbe: TableReader {
    fn program(&self) -> &str;

    fn target(&self) -> &EventHandle;

    fn is_attached(&self) -> bool;

    fn detach(&mut self) -> Result<(), ProbeError>;
}

/// The kernel facilities the probe lifecycle is built on.
pub trait Platform {
    type Probe: AttachedProbe;

    fn resolve(&self, event: &str) -> Result<EventHandle, ProbeError>;

    fn ensure_privileges(
        &self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<(), ProbeError>;

    /// Installs `artifact` on `event`. The probe is active once this returns.
    fn attach(
        &mut self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<Self::Probe, ProbeError>;
}
