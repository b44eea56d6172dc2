#![cfg_attr(not(test), no_std)]

/// Name of the kprobe program that logs a fixed message per occurrence.
pub const HELLO_PROGRAM: &str = "hello";

/// Name of the kprobe program that counts occurrences per user ID.
pub const COUNT_PROGRAM: &str = "count_execve";

/// Name of the accumulator map owned by [`COUNT_PROGRAM`].
pub const COUNTER_TABLE: &str = "COUNTER_TABLE";

pub const MAX_TRACKED_IDS: u32 = 10240;

const UID_MASK: u64 = 0xFFFF_FFFF;

// errno values as returned (negated) by bpf_map_update_elem
pub const EEXIST: i64 = 17;
pub const EAGAIN: i64 = 11;

/// Derives the table key from the value of `bpf_get_current_uid_gid`.
/// The uid lives in the low 32 bits, the gid in the high ones.
pub fn uid_key(uid_gid: u64) -> u64 {
    uid_gid & UID_MASK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// Another occurrence created the entry first.
    Exists,
    /// The map refused the entry, typically because it is full.
    Rejected(i64),
}

/// Minimal view of a `u64 -> u64` counter map.
///
/// Implemented over the kernel hash map by the probe program and over an
/// in-memory table by the user-space tests, so both run the same rule.
pub trait CounterMap {
    /// Atomically adds one to an existing entry. Returns `false` when the key
    /// is absent.
    fn increment_existing(&self, key: &u64) -> bool;

    /// Inserts `value` under `key` only if no entry exists yet.
    fn insert_new(&self, key: &u64, value: u64) -> Result<(), InsertError>;
}

/// Records one occurrence for `key`.
///
/// A miss is the normal first-occurrence path. When two occurrences race on
/// the first insert, the loser adds to the entry the winner created.
pub fn record_occurrence<M: CounterMap>(map: &M, key: u64) -> Result<(), i64> {
    if map.increment_existing(&key) {
        return Ok(());
    }

    match map.insert_new(&key, 1) {
        Ok(()) => Ok(()),
        Err(InsertError::Exists) => {
            if map.increment_existing(&key) {
                Ok(())
            } else {
                // deleted between the failed insert and the retry
                Err(-EAGAIN)
            }
        }
        Err(InsertError::Rejected(code)) => Err(code),
    }
}
