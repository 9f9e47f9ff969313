//! Centralized logging for the emulator core and systems.
//!
//! Components log through a single global [`LogConfig`] with per-category
//! levels, so a driver can turn on bus tracing without drowning in CPU spam.
//!
//! Messages are built lazily through closures and rate-limited per category;
//! a runaway condition (a game hammering an unimplemented register, or
//! thousands of cache-isolation suppressions during BIOS boot) degrades to a
//! periodic "N messages dropped" summary instead of stalling emulation.
//! File output, when enabled, goes through a background thread.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a log level from a CLI argument (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category, one per emulated subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// CPU execution (instruction tracing, jump diagnostics)
    Cpu,
    /// Bus and memory access (routing, cache-isolation suppressions)
    Bus,
    /// GPU register traffic
    Gpu,
    /// SPU register traffic
    Spu,
    /// Interrupt controller activity
    Irq,
    /// Unimplemented registers and stubbed behavior
    Stubs,
}

impl LogCategory {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            LogCategory::Cpu => 0,
            LogCategory::Bus => 1,
            LogCategory::Gpu => 2,
            LogCategory::Spu => 3,
            LogCategory::Irq => 4,
            LogCategory::Stubs => 5,
        }
    }
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    window: Duration,
    timestamps: Mutex<[VecDeque<Instant>; LogCategory::COUNT]>,
    dropped: Mutex<[usize; LogCategory::COUNT]>,
    last_report: Mutex<[Option<Instant>; LogCategory::COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            window: Duration::from_secs(1),
            timestamps: Mutex::new(Default::default()),
            dropped: Mutex::new([0; LogCategory::COUNT]),
            last_report: Mutex::new([None; LogCategory::COUNT]),
        }
    }

    /// Returns (allowed, dropped-count-to-report).
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let idx = category.index();

        let mut timestamps = self.timestamps.lock().unwrap();
        let mut dropped = self.dropped.lock().unwrap();
        let mut last_report = self.last_report.lock().unwrap();

        let window = &mut timestamps[idx];
        while let Some(&front) = window.front() {
            if now.duration_since(front) > self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.max_per_second.load(Ordering::Relaxed) {
            window.push_back(now);

            let count = dropped[idx];
            if count > 0 {
                dropped[idx] = 0;
                last_report[idx] = Some(now);
                return (true, Some(count));
            }
            (true, None)
        } else {
            dropped[idx] += 1;

            let due = match last_report[idx] {
                None => true,
                Some(last) => now.duration_since(last) >= Duration::from_secs(1),
            };
            if due {
                let count = dropped[idx];
                dropped[idx] = 0;
                last_report[idx] = Some(now);
                (false, Some(count))
            } else {
                (false, None)
            }
        }
    }
}

/// Global logging configuration.
pub struct LogConfig {
    /// Fallback level when a category has no specific level set
    global_level: AtomicU8,
    /// Per-category levels, indexed by `LogCategory::index`
    levels: [AtomicU8; LogCategory::COUNT],
    /// Channel to the background file-writer thread
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        const OFF: AtomicU8 = AtomicU8::new(LogLevel::Off as u8);
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: [OFF; LogCategory::COUNT],
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// The process-wide singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the fallback level for categories with no explicit level
    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category-specific level, when set, takes precedence over the
    /// global fallback.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Turn all logging off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for level in &self.levels {
            level.store(LogLevel::Off as u8, Ordering::Relaxed);
        }
    }

    /// Maximum messages per second per category
    pub fn set_rate_limit(&self, max_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Route log output to a file, written by a background thread so the
    /// emulation loop never blocks on disk I/O.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    // Logging must never crash the emulator
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
                let _ = file.flush();
            })?;

        let mut log_sender = self.log_sender.lock().unwrap();
        *log_sender = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);

        Ok(())
    }

    /// Stop logging to file; the writer thread exits when its channel drops.
    pub fn clear_log_file(&self) {
        let mut log_sender = self.log_sender.lock().unwrap();
        *log_sender = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            let log_sender = self.log_sender.lock().unwrap();
            if let Some(ref sender) = *log_sender {
                if sender.send(message.to_string()).is_err() {
                    eprintln!("{}", message);
                }
            } else {
                eprintln!("{}", message);
            }
        } else {
            eprintln!("{}", message);
        }
    }
}

/// Log a message for the given category and level.
///
/// The message closure is only evaluated when the category/level combination
/// is enabled and the rate limiter allows it, so a disabled log site costs
/// two relaxed atomic loads.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        let (allowed, dropped) = config.rate_limiter.should_allow(category);

        if let Some(count) = dropped {
            if count > 0 {
                let warning = format!(
                    "[{:?}] rate limit exceeded, {} message(s) dropped in the last second",
                    category, count
                );
                config.write_message(&warning);
            }
        }

        if allowed {
            let message = message_fn();
            config.write_message(&message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("Info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("4"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("invalid"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Bus, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Bus, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Cpu, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Cpu, LogLevel::Error));
    }

    #[test]
    fn test_global_level_fallback() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Warn);

        assert!(config.should_log(LogCategory::Spu, LogLevel::Error));
        assert!(config.should_log(LogCategory::Spu, LogLevel::Warn));
        assert!(!config.should_log(LogCategory::Spu, LogLevel::Info));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Gpu, LogLevel::Info);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Gpu), LogLevel::Off);
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(60);

        for _ in 0..60 {
            let (allowed, _) = limiter.should_allow(LogCategory::Cpu);
            assert!(allowed);
        }

        let (allowed, _) = limiter.should_allow(LogCategory::Cpu);
        assert!(!allowed, "61st message within a second must be dropped");
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(60);

        for _ in 0..60 {
            limiter.should_allow(LogCategory::Bus);
        }

        let (allowed, _) = limiter.should_allow(LogCategory::Bus);
        assert!(!allowed);

        let (allowed, _) = limiter.should_allow(LogCategory::Irq);
        assert!(allowed, "other categories keep their own budget");
    }

    #[test]
    fn test_rate_limiter_reports_dropped_count() {
        let limiter = RateLimiter::new(5);

        for _ in 0..5 {
            limiter.should_allow(LogCategory::Stubs);
        }
        for _ in 0..10 {
            limiter.should_allow(LogCategory::Stubs);
        }

        std::thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Stubs);
        assert!(allowed);
        let dropped = dropped.expect("should report dropped count");
        assert!((9..=10).contains(&dropped), "got {}", dropped);
    }
}
