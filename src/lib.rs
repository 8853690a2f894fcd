#![cfg_attr(not(test), no_std)]

//! mcp-os: the scheduling subsystem of a many-core-process (MCP) kernel.
//!
//! An MCP may hold several physical cores at once and schedules its own
//! userspace threads across them; the kernel's job, implemented here, is to
//! decide which process owns which core. The subsystem is built from:
//!
//! - `process`: PCB arena, process state machine, resource requests
//! - `corealloc`: physical-core registry and the FCFS core allocator
//! - `ksched`: the scheduler decision loop (the single serialization point)
//! - `smp`: per-core kernel message queues (cross-core start/stop signals)
//! - `event`: userspace event mailboxes (preemption notices)
//! - `alarm`: one-shot virtual-time alarms (revocation deadlines)
//!
//! All scheduler-visible state is guarded by one global lock inside `ksched`;
//! the only asynchronous edges are the per-core kernel messages, which
//! re-validate against the registry before acting.

extern crate alloc;

pub mod alarm;
pub mod corealloc;
pub mod errno;
pub mod event;
pub mod ksched;
pub mod logger;
pub mod process;
pub mod smp;
pub mod syscall;

#[cfg(test)]
mod tests;

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

/// Log at PANIC level, then abort. Used for internal consistency failures
/// (e.g. an illegal process state transition), which indicate a scheduler
/// bug and are never recoverable.
#[macro_export]
macro_rules! kpanic {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::PANIC, $($arg)*);
        panic!($($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}
