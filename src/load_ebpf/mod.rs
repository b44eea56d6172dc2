use std::path::PathBuf;

use aya::maps::HashMap;
use aya::programs::kprobe::KProbeLinkId;
use aya::programs::{KProbe, ProgramError};
use aya::Bpf;
use aya_log::BpfLogger;
use log::{debug, info, warn};

use crate::config_manager::Config;
use crate::errors::ProbeError;
use crate::platform::{AttachedProbe, EventHandle, Platform, TableReader};
use crate::probe::ProbeArtifact;
use crate::snapshot::Snapshot;
use crate::symbols::KernelSymbols;

/// Loads the compiled probe object with aya and attaches it as a kprobe.
pub struct AyaPlatform {
    object_path: PathBuf,
    kallsyms_path: PathBuf,
}

impl AyaPlatform {
    pub fn new(config: &Config) -> Self {
        AyaPlatform {
            object_path: config.object_path.clone(),
            kallsyms_path: config.kallsyms_path.clone(),
        }
    }
}

fn bump_memlock_rlimit() {
    // Bump the memlock rlimit. This is needed for older kernels that don't use the
    // new memcg based accounting, see https://lwn.net/Articles/837122/
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("remove limit on locked memory failed, ret is: {}", ret);
    }
}

impl Platform for AyaPlatform {
    type Probe = AyaProbe;

    fn resolve(&self, event: &str) -> Result<EventHandle, ProbeError> {
        let symbols = KernelSymbols::load(&self.kallsyms_path)
            .map_err(|e| ProbeError::resolution(event, format!("{:#}", e)))?;
        symbols.resolve_syscall(event)
    }

    fn ensure_privileges(
        &self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<(), ProbeError> {
        let euid = unsafe { libc::geteuid() };
        if euid != 0 {
            return Err(ProbeError::attachment(
                artifact.program,
                event.symbol(),
                format!(
                    "loading kernel probes requires root privileges (effective uid is {})",
                    euid
                ),
            ));
        }
        Ok(())
    }

    fn attach(
        &mut self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<AyaProbe, ProbeError> {
        let failed =
            |reason: String| ProbeError::attachment(artifact.program, event.symbol(), reason);

        bump_memlock_rlimit();

        let mut bpf = Bpf::load_file(&self.object_path)
            .map_err(|e| failed(format!("failed to load {:?}: {}", self.object_path, e)))?;
        debug!("loaded probe object {:?}", self.object_path);

        if let Err(e) = BpfLogger::init(&mut bpf) {
            if artifact.needs_logger {
                return Err(failed(format!("failed to initialize eBPF logger: {}", e)));
            }
            // This can happen if you remove all log statements from your eBPF program.
            warn!("failed to initialize eBPF logger: {}", e);
        }

        if let Some(table) = artifact.table {
            if bpf.map(table).is_none() {
                return Err(failed(format!("table {} not found in probe object", table)));
            }
        }

        let program = bpf
            .program_mut(artifact.program)
            .ok_or_else(|| failed("program not found in probe object".to_string()))?;
        let program: &mut KProbe = program
            .try_into()
            .map_err(|e: ProgramError| failed(e.to_string()))?;
        program.load().map_err(|e| failed(e.to_string()))?;
        debug!("loaded program {}", artifact.program);
        let link = program
            .attach(event.symbol(), 0)
            .map_err(|e| failed(e.to_string()))?;

        info!("attached {} to {}", artifact.program, event.symbol());

        Ok(AyaProbe {
            bpf,
            program: artifact.program.to_string(),
            target: event.clone(),
            table: artifact.table,
            link: Some(link),
        })
    }
}

/// Owns the loaded object; links are released on detach or drop.
pub struct AyaProbe {
    bpf: Bpf,
    program: String,
    target: EventHandle,
    table: Option<&'static str>,
    link: Option<KProbeLinkId>,
}

impl TableReader for AyaProbe {
    fn read_table(&self) -> Result<Snapshot, ProbeError> {
        let table = self
            .table
            .ok_or_else(|| ProbeError::table_read(&self.program, "probe has no table"))?;
        if !self.is_attached() {
            return Err(ProbeError::table_read(table, "probe is detached"));
        }

        let map = self
            .bpf
            .map(table)
            .ok_or_else(|| ProbeError::table_read(table, "map not found"))?;
        let counters: HashMap<_, u64, u64> =
            HashMap::try_from(map).map_err(|e| ProbeError::table_read(table, e))?;

        counters
            .iter()
            .map(|entry| entry.map_err(|e| ProbeError::table_read(table, e)))
            .collect()
    }
}

impl AttachedProbe for AyaProbe {
    fn program(&self) -> &str {
        &self.program
    }

    fn target(&self) -> &EventHandle {
        &self.target
    }

    fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    fn detach(&mut self) -> Result<(), ProbeError> {
        let Some(link) = self.link.take() else {
            return Ok(());
        };

        let program = self
            .bpf
            .program_mut(&self.program)
            .ok_or_else(|| ProbeError::detachment(&self.program, "program not found"))?;
        let program: &mut KProbe = program
            .try_into()
            .map_err(|e: ProgramError| ProbeError::detachment(&self.program, e))?;
        program
            .detach(link)
            .map_err(|e| ProbeError::detachment(&self.program, e))?;

        info!("detached {} from {}", self.program, self.target.symbol());
        Ok(())
    }
}

impl Drop for AyaProbe {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!("{}", e);
        }
    }
}
