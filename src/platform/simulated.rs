//! In-memory stand-in for the kernel, running the same accumulation rule as
//! the probe program.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use execwatch_common::{record_occurrence, uid_key, CounterMap, InsertError};

use super::{AttachedProbe, EventHandle, Platform, TableReader};
use crate::errors::ProbeError;
use crate::probe::ProbeArtifact;
use crate::snapshot::Snapshot;
use crate::symbols::KernelSymbols;

const E2BIG: i64 = 7;

#[derive(Debug)]
pub struct SimulatedTable {
    entries: RwLock<HashMap<u64, AtomicU64>>,
    capacity: usize,
}

impl SimulatedTable {
    pub fn new(capacity: usize) -> Self {
        SimulatedTable {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let entries = self.entries.read().unwrap();
        entries
            .iter()
            .map(|(key, value)| (*key, value.load(Ordering::SeqCst)))
            .collect()
    }
}

impl CounterMap for SimulatedTable {
    fn increment_existing(&self, key: &u64) -> bool {
        match self.entries.read().unwrap().get(key) {
            Some(value) => {
                value.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    fn insert_new(&self, key: &u64, value: u64) -> Result<(), InsertError> {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(key) {
            return Err(InsertError::Exists);
        }
        if entries.len() >= self.capacity {
            return Err(InsertError::Rejected(-E2BIG));
        }
        entries.insert(*key, AtomicU64::new(value));
        Ok(())
    }
}

/// Fake kernel: a symbol list, one counter table and the number of live
/// count probes. Clones share state so tests can trigger occurrences while
/// the probe is owned elsewhere.
#[derive(Clone)]
pub struct SimulatedPlatform {
    symbols: Arc<KernelSymbols>,
    table: Arc<SimulatedTable>,
    attached: Arc<AtomicUsize>,
    privileged: bool,
    reject_attach: bool,
    logger_available: bool,
    table_in_object: bool,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        let symbols = KernelSymbols::from_reader(
            "0 T sys_bpf\n0 T sys_execve\n0 T sys_execveat\n".as_bytes(),
        )
        .unwrap();
        SimulatedPlatform {
            symbols: Arc::new(symbols),
            table: Arc::new(SimulatedTable::new(execwatch_common::MAX_TRACKED_IDS as usize)),
            attached: Arc::new(AtomicUsize::new(0)),
            privileged: true,
            reject_attach: false,
            logger_available: true,
            table_in_object: true,
        }
    }

    pub fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_attach = true;
        self
    }

    /// Kernel log forwarding cannot be set up, as when the object has no
    /// log statements or the log ring buffer is missing.
    pub fn without_logger(mut self) -> Self {
        self.logger_available = false;
        self
    }

    /// The loaded object lacks the counter table.
    pub fn without_table(mut self) -> Self {
        self.table_in_object = false;
        self
    }

    pub fn attached_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// One `execve` by a process with the given uid/gid pair. Only counted
    /// while a count probe is attached.
    pub fn trigger(&self, uid_gid: u64) {
        if self.attached_count() > 0 {
            record_occurrence(self.table.as_ref(), uid_key(uid_gid)).unwrap();
        }
    }

    pub fn trigger_uid(&self, uid: u32, times: usize) {
        for _ in 0..times {
            self.trigger(uid as u64);
        }
    }
}

impl Platform for SimulatedPlatform {
    type Probe = SimulatedProbe;

    fn resolve(&self, event: &str) -> Result<EventHandle, ProbeError> {
        self.symbols.resolve_syscall(event)
    }

    fn ensure_privileges(
        &self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<(), ProbeError> {
        if self.privileged {
            Ok(())
        } else {
            Err(ProbeError::attachment(
                artifact.program,
                event.symbol(),
                "requires root privileges",
            ))
        }
    }

    fn attach(
        &mut self,
        event: &EventHandle,
        artifact: &ProbeArtifact,
    ) -> Result<SimulatedProbe, ProbeError> {
        if self.reject_attach {
            return Err(ProbeError::attachment(
                artifact.program,
                event.symbol(),
                "verifier rejected program",
            ));
        }
        if artifact.needs_logger && !self.logger_available {
            return Err(ProbeError::attachment(
                artifact.program,
                event.symbol(),
                "failed to initialize eBPF logger",
            ));
        }

        if let Some(name) = artifact.table {
            if !self.table_in_object {
                return Err(ProbeError::attachment(
                    artifact.program,
                    event.symbol(),
                    format!("table {} not found in probe object", name),
                ));
            }
        }

        let table = artifact.table.map(|name| (name, self.table.clone()));
        if table.is_some() {
            self.attached.fetch_add(1, Ordering::SeqCst);
        }

        Ok(SimulatedProbe {
            program: artifact.program.to_string(),
            target: event.clone(),
            table,
            attached_count: self.attached.clone(),
            attached: true,
        })
    }
}

#[derive(Debug)]
pub struct SimulatedProbe {
    program: String,
    target: EventHandle,
    table: Option<(&'static str, Arc<SimulatedTable>)>,
    attached_count: Arc<AtomicUsize>,
    attached: bool,
}

impl TableReader for SimulatedProbe {
    fn read_table(&self) -> Result<Snapshot, ProbeError> {
        let (name, table) = self
            .table
            .as_ref()
            .ok_or_else(|| ProbeError::table_read(&self.program, "probe has no table"))?;
        if !self.is_attached() {
            return Err(ProbeError::table_read(name, "probe is detached"));
        }
        Ok(table.snapshot())
    }
}

impl AttachedProbe for SimulatedProbe {
    fn program(&self) -> &str {
        &self.program
    }

    fn target(&self) -> &EventHandle {
        &self.target
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn detach(&mut self) -> Result<(), ProbeError> {
        if self.attached {
            self.attached = false;
            if self.table.is_some() {
                self.attached_count.fetch_sub(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

impl Drop for SimulatedProbe {
    fn drop(&mut self) {
        let _ = self.detach();
    }
}
