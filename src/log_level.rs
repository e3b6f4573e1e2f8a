//! The four-level filter `Browser::set_log_level` gates the supervisor's
//! own `tracing` emission with (§10). It does not install or reconfigure a
//! subscriber — that stays the embedding application's job.

use std::sync::atomic::{AtomicU8, Ordering};

/// How chatty the supervisor's own `tracing` calls should be.
///
/// Ordered so `level >= LogLevel::Warnings` reads naturally: anything at
/// or above a given level is emitted, everything below it is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Warnings,
    Info,
    Debug,
}

impl LogLevel {
    fn from_u8(value: u8) -> LogLevel {
        match value {
            0 => LogLevel::Silent,
            1 => LogLevel::Warnings,
            2 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// Shared, lock-free storage for the current [`LogLevel`]: one `Browser`
/// clone can raise or lower it and every other clone (and the event loop
/// task) sees the change on its next check.
#[derive(Debug)]
pub(crate) struct LogGate(AtomicU8);

impl LogGate {
    pub(crate) fn new(level: LogLevel) -> Self {
        LogGate(AtomicU8::new(level as u8))
    }

    pub(crate) fn set(&self, level: LogLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_lets_higher_levels_subsume_lower_ones() {
        assert!(LogLevel::Debug > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Warnings);
        assert!(LogLevel::Warnings > LogLevel::Silent);
    }

    #[test]
    fn gate_reflects_the_most_recent_set() {
        let gate = LogGate::new(LogLevel::Silent);
        assert_eq!(gate.get(), LogLevel::Silent);
        gate.set(LogLevel::Debug);
        assert_eq!(gate.get(), LogLevel::Debug);
    }
}
