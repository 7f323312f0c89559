//! SQLite file-lock levels and per-device lock bookkeeping
//!
//! Each open handle remembers the [`LockLevel`] it holds; the device keeps the
//! shared counters every handle must agree on. The state lives behind its own
//! mutex, separate from the page store, so a connection spinning for an
//! exclusive lock never blocks page I/O.

use crate::error::{MemDbError, Result};
use std::time::{Duration, Instant};

/// How long an EXCLUSIVE request waits for other readers to drain
pub const EXCLUSIVE_WAIT: Duration = Duration::from_millis(1);

/// SQLite lock levels, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(i32)]
pub enum LockLevel {
    #[default]
    None = 0,
    Shared = 1,
    Reserved = 2,
    Pending = 3,
    Exclusive = 4,
}

impl LockLevel {
    /// Map a raw `SQLITE_LOCK_*` value; unknown values clamp to the nearest level
    pub fn from_raw(value: i32) -> Self {
        match value {
            i32::MIN..=0 => LockLevel::None,
            1 => LockLevel::Shared,
            2 => LockLevel::Reserved,
            3 => LockLevel::Pending,
            _ => LockLevel::Exclusive,
        }
    }
}

/// Lock counters shared by all handles on one device
#[derive(Debug, Default)]
pub(crate) struct LockState {
    shared: usize,
    reserved: bool,
    pending: bool,
}

impl LockState {
    pub(crate) fn shared(&self) -> usize {
        self.shared
    }

    pub(crate) fn reserved(&self) -> bool {
        self.reserved
    }
}

/// Raise `held` to `want`, following SQLite's lock transitions.
///
/// `relock` is invoked with the state unlocked while waiting for readers to
/// drain; it must re-acquire and return the guard.
pub(crate) fn acquire<G, F>(
    mut guard: G,
    held: &mut LockLevel,
    want: LockLevel,
    mut relock: F,
) -> Result<()>
where
    G: std::ops::DerefMut<Target = LockState>,
    F: FnMut(G) -> G,
{
    if *held >= want {
        return Ok(());
    }

    // Every stronger level implies SHARED
    if *held == LockLevel::None {
        if guard.pending {
            return Err(MemDbError::Busy);
        }
        guard.shared += 1;
        *held = LockLevel::Shared;
    }

    match want {
        LockLevel::Reserved => {
            if guard.reserved {
                return Err(MemDbError::Busy);
            }
            guard.reserved = true;
        }
        LockLevel::Pending | LockLevel::Exclusive => {
            // PENDING and EXCLUSIVE are only ever held on top of this
            // handle's own RESERVED
            if *held < LockLevel::Reserved {
                if guard.reserved {
                    return Err(MemDbError::Busy);
                }
                guard.reserved = true;
                *held = LockLevel::Reserved;
            }
            if *held < LockLevel::Pending {
                *held = LockLevel::Pending;
                guard.pending = true;
            }

            if want == LockLevel::Exclusive {
                let started = Instant::now();
                while guard.shared > 1 {
                    if started.elapsed() > EXCLUSIVE_WAIT {
                        return Err(MemDbError::Busy);
                    }
                    guard = relock(guard);
                }
            }
        }
        LockLevel::None | LockLevel::Shared => {}
    }

    *held = want;
    Ok(())
}

/// Lower `held` to `want`.
///
/// A handle at RESERVED or above always owns the reserved flag, and one at
/// PENDING or above owns the pending flag, so only those are cleared.
pub(crate) fn release(state: &mut LockState, held: &mut LockLevel, want: LockLevel) {
    if *held <= want {
        return;
    }

    if *held >= LockLevel::Pending && want < LockLevel::Pending {
        state.pending = false;
    }
    if *held >= LockLevel::Reserved && want < LockLevel::Reserved {
        state.reserved = false;
    }
    if want < LockLevel::Shared {
        state.shared = state.shared.saturating_sub(1);
    }

    *held = want;
}
