//! Syscall veneer over the scheduler.
//!
//! Flat-argument entry points for a trap path to call. Kernel-internal
//! callers should use [`crate::ksched`] directly; this layer only maps
//! integer arguments onto it and folds `Result`s into the return-register
//! convention (negative errno on failure).

use crate::errno::Error;
use crate::ksched::{self, RequestOutcome};
use crate::process::{Pid, ReqFlags, ResourceRequest};
use crate::kinfo;

/// System call numbers
pub const SYS_PROC_CREATE: u64 = 1;
pub const SYS_PROC_RUN: u64 = 2;
pub const SYS_PROC_DESTROY: u64 = 3;
pub const SYS_PROC_YIELD: u64 = 4;
pub const SYS_REQUEST_CORES: u64 = 5;
pub const SYS_CANCEL_REQUEST: u64 = 6;
pub const SYS_PROVISION: u64 = 7;
pub const SYS_DEPROVISION: u64 = 8;
pub const SYS_BLOCK: u64 = 9;
pub const SYS_WAKE: u64 = 10;
pub const SYS_GET_TICK: u64 = 11;

/// Returned by `SYS_REQUEST_CORES` and `SYS_PROC_RUN` when the request was
/// accepted but is still queued behind earlier requests.
pub const RET_PENDING: i64 = 0;

fn ret(res: Result<u64, Error>) -> i64 {
    match res {
        Ok(v) => v as i64,
        Err(e) => -(e.code() as i64),
    }
}

fn outcome(res: Result<RequestOutcome, Error>) -> i64 {
    match res {
        Ok(RequestOutcome::Granted(n)) => n as i64,
        Ok(RequestOutcome::Pending) => RET_PENDING,
        Err(e) => -(e.code() as i64),
    }
}

pub fn syscall_dispatch(nr: u64, arg1: u64, arg2: u64, arg3: u64, arg4: u64) -> i64 {
    match nr {
        SYS_PROC_CREATE => ret(ksched::create_process(arg1 as Pid)),
        SYS_PROC_RUN => outcome(ksched::run_process(arg1 as Pid)),
        SYS_PROC_DESTROY => ret(ksched::destroy_process(arg1 as Pid).map(|_| 0)),
        SYS_PROC_YIELD => ret(ksched::yield_core(arg1 as Pid, arg2 as usize).map(|_| 0)),
        SYS_REQUEST_CORES => {
            let req = ResourceRequest::new(arg2 as u32, arg3 as u32)
                .with_flags(ReqFlags::from_bits_truncate(arg4 as u32));
            outcome(ksched::request_cores(arg1 as Pid, req))
        }
        SYS_CANCEL_REQUEST => ret(ksched::cancel_request(arg1 as Pid).map(|_| 0)),
        SYS_PROVISION => ret(ksched::provision_core(arg1 as Pid, arg2 as usize).map(|_| 0)),
        SYS_DEPROVISION => ret(ksched::deprovision_core(arg1 as usize).map(|_| 0)),
        SYS_BLOCK => ret(ksched::block_process(arg1 as Pid).map(|_| 0)),
        SYS_WAKE => {
            if ksched::wake_process(arg1 as Pid) {
                1
            } else {
                0
            }
        }
        SYS_GET_TICK => ksched::get_tick() as i64,
        _ => {
            kinfo!("unknown syscall: {}", nr);
            -(Error::Inval.code() as i64)
        }
    }
}
