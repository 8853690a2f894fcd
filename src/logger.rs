//! Kernel logging.
//!
//! Log lines are formatted into a fixed-size in-memory ring buffer, stamped
//! with the scheduler's virtual tick so revocation deadlines line up with the
//! log. The maximum level is runtime-adjustable; `parse_level_directive`
//! understands the `loglevel=` boot-cmdline directive. There is no hardware
//! console here: the ring is the sink, and the test harness mirrors lines to
//! stderr.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU8, Ordering};

use spin::Mutex;

/// Bytes retained by the log ring. Old lines are overwritten once it wraps.
const LOG_RING_SIZE: usize = 32 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum LogLevel {
    PANIC,
    FATAL,
    ERROR,
    WARN,
    INFO,
    DEBUG,
    TRACE,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::PANIC => "PANIC",
            LogLevel::FATAL => "FATAL",
            LogLevel::ERROR => "ERROR",
            LogLevel::WARN => "WARN",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::TRACE => "TRACE",
        }
    }

    const fn priority(self) -> u8 {
        match self {
            LogLevel::PANIC => 0,
            LogLevel::FATAL => 1,
            LogLevel::ERROR => 2,
            LogLevel::WARN => 3,
            LogLevel::INFO => 4,
            LogLevel::DEBUG => 5,
            LogLevel::TRACE => 6,
        }
    }

    fn from_priority(priority: u8) -> LogLevel {
        match priority {
            0 => LogLevel::PANIC,
            1 => LogLevel::FATAL,
            2 => LogLevel::ERROR,
            3 => LogLevel::WARN,
            4 => LogLevel::INFO,
            5 => LogLevel::DEBUG,
            _ => LogLevel::TRACE,
        }
    }

    fn from_name(name: &str) -> Option<LogLevel> {
        match name {
            "panic" => Some(LogLevel::PANIC),
            "fatal" => Some(LogLevel::FATAL),
            "error" => Some(LogLevel::ERROR),
            "warn" => Some(LogLevel::WARN),
            "info" => Some(LogLevel::INFO),
            "debug" => Some(LogLevel::DEBUG),
            "trace" => Some(LogLevel::TRACE),
            _ => None,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::INFO.priority());

struct LogRing {
    buf: [u8; LOG_RING_SIZE],
    pos: usize,
    wrapped: bool,
}

impl LogRing {
    const fn new() -> Self {
        Self {
            buf: [0; LOG_RING_SIZE],
            pos: 0,
            wrapped: false,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.buf[self.pos] = b;
            self.pos += 1;
            if self.pos == LOG_RING_SIZE {
                self.pos = 0;
                self.wrapped = true;
            }
        }
    }
}

impl Write for LogRing {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}

static LOG_RING: Mutex<LogRing> = Mutex::new(LogRing::new());

pub fn set_max_level(level: LogLevel) {
    LOG_LEVEL.store(level.priority(), Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_priority(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn log_enabled(level: LogLevel) -> bool {
    level.priority() <= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Scan a boot cmdline for a `loglevel=<name>` directive.
pub fn parse_level_directive(cmdline: &str) -> Option<LogLevel> {
    for arg in cmdline.split_whitespace() {
        if let Some(value) = arg.strip_prefix("loglevel=") {
            return LogLevel::from_name(value);
        }
    }
    None
}

pub fn log(level: LogLevel, args: fmt::Arguments) {
    if !log_enabled(level) {
        return;
    }
    let tick = crate::ksched::get_tick();
    {
        let mut ring = LOG_RING.lock();
        let _ = write!(ring, "[{:>6}] [{:>5}] {}\n", tick, level.as_str(), args);
    }
    #[cfg(test)]
    eprintln!("[{:>6}] [{:>5}] {}", tick, level.as_str(), args);
}

/// Copy out the ring contents in log order, oldest line fragment first.
pub fn ring_snapshot() -> alloc::string::String {
    let ring = LOG_RING.lock();
    let mut out = alloc::string::String::new();
    if ring.wrapped {
        out.push_str(&alloc::string::String::from_utf8_lossy(
            &ring.buf[ring.pos..],
        ));
    }
    out.push_str(&alloc::string::String::from_utf8_lossy(
        &ring.buf[..ring.pos],
    ));
    out
}

pub fn clear_ring() {
    let mut ring = LOG_RING.lock();
    ring.pos = 0;
    ring.wrapped = false;
}
