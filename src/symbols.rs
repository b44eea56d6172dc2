use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::ProbeError;
use crate::platform::EventHandle;

#[cfg(target_arch = "x86_64")]
const ARCH_SYSCALL_PREFIXES: &[&str] = &["__x64_sys_", "__ia32_sys_"];
#[cfg(target_arch = "aarch64")]
const ARCH_SYSCALL_PREFIXES: &[&str] = &["__arm64_sys_"];
#[cfg(target_arch = "s390x")]
const ARCH_SYSCALL_PREFIXES: &[&str] = &["__s390x_sys_"];
#[cfg(target_arch = "riscv64")]
const ARCH_SYSCALL_PREFIXES: &[&str] = &["__riscv_sys_"];
#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "s390x",
    target_arch = "riscv64"
)))]
const ARCH_SYSCALL_PREFIXES: &[&str] = &[];

const LEGACY_SYSCALL_PREFIX: &str = "sys_";

// every kernel with eBPF support exports the bpf syscall
const PREFIX_PROBE_SYSCALL: &str = "bpf";

/// Symbol names exported by the running kernel.
pub struct KernelSymbols {
    names: HashSet<String>,
}

impl KernelSymbols {
    pub fn load(path: &Path) -> Result<KernelSymbols> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        KernelSymbols::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read {:?}", path))
    }

    /// Parses `/proc/kallsyms` lines: `<address> <type> <name> [module]`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<KernelSymbols> {
        let mut names = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            if let Some(name) = line.split_whitespace().nth(2) {
                names.insert(name.to_string());
            }
        }
        Ok(KernelSymbols { names })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.names.contains(symbol)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The prefix the kernel puts in front of syscall entry points.
    pub fn syscall_prefix(&self) -> Option<&'static str> {
        std::iter::once(LEGACY_SYSCALL_PREFIX)
            .chain(ARCH_SYSCALL_PREFIXES.iter().copied())
            .find(|prefix| self.contains(&format!("{}{}", prefix, PREFIX_PROBE_SYSCALL)))
    }

    /// Maps a syscall name such as `execve` to its kernel entry symbol.
    /// Names that already are kernel symbols are taken as is.
    pub fn resolve_syscall(&self, event: &str) -> Result<EventHandle, ProbeError> {
        if event.is_empty() {
            return Err(ProbeError::resolution(event, "empty event name"));
        }

        if self.contains(event) {
            return Ok(EventHandle::new(event, event));
        }

        let prefix = self.syscall_prefix().ok_or_else(|| {
            ProbeError::resolution(event, "no syscall entry points found in kernel symbols")
        })?;

        let symbol = format!("{}{}", prefix, event);
        if self.contains(&symbol) {
            Ok(EventHandle::new(event, &symbol))
        } else {
            Err(ProbeError::resolution(
                event,
                format!("kernel symbol `{}` not found", symbol),
            ))
        }
    }
}
