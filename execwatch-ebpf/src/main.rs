#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU64, Ordering};

use aya_ebpf::{
    bindings::BPF_NOEXIST,
    helpers::bpf_get_current_uid_gid,
    macros::{kprobe, map},
    maps::HashMap,
    programs::ProbeContext,
};
use aya_log_ebpf::{info, warn};
use execwatch_common::{
    record_occurrence, uid_key, CounterMap, InsertError, EEXIST, MAX_TRACKED_IDS,
};

#[map(name = "COUNTER_TABLE")]
static COUNTER_TABLE: HashMap<u64, u64> =
    HashMap::<u64, u64>::with_max_entries(MAX_TRACKED_IDS, 0);

struct KernelCounters<'a>(&'a HashMap<u64, u64>);

impl CounterMap for KernelCounters<'_> {
    fn increment_existing(&self, key: &u64) -> bool {
        match self.0.get_ptr_mut(key) {
            Some(value) => {
                // lowered to an atomic add so concurrent cpus never lose an update
                let counter = unsafe { AtomicU64::from_ptr(value) };
                counter.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn insert_new(&self, key: &u64, value: u64) -> Result<(), InsertError> {
        self.0
            .insert(key, &value, BPF_NOEXIST as u64)
            .map_err(|code| {
                if code == -EEXIST {
                    InsertError::Exists
                } else {
                    InsertError::Rejected(code)
                }
            })
    }
}

#[kprobe]
pub fn hello(ctx: ProbeContext) -> u32 {
    info!(&ctx, "Hello World!");
    0
}

#[kprobe]
pub fn count_execve(ctx: ProbeContext) -> u32 {
    let uid = uid_key(bpf_get_current_uid_gid());

    match record_occurrence(&KernelCounters(&COUNTER_TABLE), uid) {
        Ok(()) => 0,
        Err(code) => {
            warn!(&ctx, "dropped occurrence for id {}: {}", uid, code);
            1
        }
    }
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
