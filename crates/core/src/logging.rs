//! Centralized logging configuration for the emulator.
//!
//! # Architecture
//!
//! - **LogConfig**: process-wide configuration held in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: PPU, Dma, Interrupts, Bus
//! - **log()**: the single output path; messages are built lazily and
//!   rate limited per category
//!
//! Output goes to stderr unless a log file is configured, in which case a
//! background thread receives messages over a channel and does the file I/O
//! so the emulation loop never blocks on disk.
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogConfig, LogLevel};
//!
//! LogConfig::global().apply_filter("ppu=debug").unwrap();
//! log(LogCategory::PPU, LogLevel::Debug, || {
//!     format!("PPU: LY={} mode={}", 144, 1)
//! });
//! # LogConfig::global().reset();
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
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
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
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

/// Log category for different emulator components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Picture unit: register writes, mode changes, frame presentation
    PPU,
    /// OAM DMA and VRAM DMA (general and HBlank-linked)
    Dma,
    /// VBlank / STAT interrupt requests
    Interrupts,
    /// Bus accesses (unmapped or ignored addresses)
    Bus,
}

impl LogCategory {
    /// Every category, in index order.
    pub const ALL: [LogCategory; 4] = [
        LogCategory::PPU,
        LogCategory::Dma,
        LogCategory::Interrupts,
        LogCategory::Bus,
    ];

    const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        match self {
            LogCategory::PPU => 0,
            LogCategory::Dma => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Bus => 3,
        }
    }

    /// Parse a category name (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ppu" | "lcd" | "gpu" => Some(LogCategory::PPU),
            "dma" | "hdma" => Some(LogCategory::Dma),
            "interrupts" | "irq" | "int" => Some(LogCategory::Interrupts),
            "bus" | "mem" => Some(LogCategory::Bus),
            _ => None,
        }
    }
}

/// Error returned by [`LogConfig::apply_filter`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LogFilterError {
    #[error("unknown log category `{0}`")]
    UnknownCategory(String),
    #[error("unknown log level `{0}`")]
    UnknownLevel(String),
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    window: Duration,
    state: Mutex<[WindowState; LogCategory::COUNT]>,
}

#[derive(Default)]
struct WindowState {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            window: Duration::from_secs(1),
            state: Mutex::new(Default::default()),
        }
    }

    /// Returns (allowed, dropped_count) where dropped_count is Some(n) when
    /// a summary of dropped messages should be emitted now.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let max = self.max_per_second.load(Ordering::Relaxed);
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let win = &mut state[category.index()];

        while let Some(&front) = win.timestamps.front() {
            if now.duration_since(front) > self.window {
                win.timestamps.pop_front();
            } else {
                break;
            }
        }

        if win.timestamps.len() < max {
            win.timestamps.push_back(now);
            if win.dropped > 0 {
                let dropped = std::mem::take(&mut win.dropped);
                win.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        win.dropped += 1;
        let report_due = win
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if report_due {
            let dropped = std::mem::take(&mut win.dropped);
            win.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; LogCategory::COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// Create a new LogConfig with all logging disabled and a limit of
    /// 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category-specific level wins when set; otherwise the global level
    /// applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Apply a filter such as `"warn,ppu=debug,dma=trace"`.
    ///
    /// A bare level sets the global level; `category=level` sets one
    /// category. The filter is validated completely before anything changes.
    pub fn apply_filter(&self, filter: &str) -> Result<(), LogFilterError> {
        let mut global = None;
        let mut overrides = Vec::new();

        for part in filter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((cat, lvl)) => {
                    let category = LogCategory::from_str(cat)
                        .ok_or_else(|| LogFilterError::UnknownCategory(cat.trim().to_string()))?;
                    let level = LogLevel::from_str(lvl)
                        .ok_or_else(|| LogFilterError::UnknownLevel(lvl.trim().to_string()))?;
                    overrides.push((category, level));
                }
                None => {
                    let level = LogLevel::from_str(part)
                        .ok_or_else(|| LogFilterError::UnknownLevel(part.to_string()))?;
                    global = Some(level);
                }
            }
        }

        if let Some(level) = global {
            self.set_global_level(level);
        }
        for (category, level) in overrides {
            self.set_level(category, level);
        }
        Ok(())
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Set the maximum logs per second per category
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Send log output to a file, written by a background thread.
    ///
    /// Replaces any previously configured file.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    // Logging must never take the emulator down.
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *self.sender_slot() = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits once its channel closes.
    pub fn clear_log_file(&self) {
        *self.sender_slot() = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn sender_slot(&self) -> std::sync::MutexGuard<'_, Option<Sender<String>>> {
        match self.log_sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_message(&self, message: String) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = self.sender_slot().as_ref() {
                if let Err(failed) = sender.send(message) {
                    eprintln!("{}", failed.0);
                }
                return;
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level
///
/// The closure only runs when the category/level is enabled and the
/// category is under its rate limit.
///
/// ```rust
/// use emu_core::logging::{log, LogCategory, LogLevel};
///
/// log(LogCategory::Dma, LogLevel::Trace, || {
///     format!("HDMA: {:04X} -> {:04X}", 0xC000, 0x8000)
/// });
/// ```
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(format!(
            "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
            category, count
        ));
    }
    if allowed {
        config.write_message(message_fn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("TRACE"), Some(LogLevel::Trace));
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
    fn test_category_parsing() {
        assert_eq!(LogCategory::from_str("PPU"), Some(LogCategory::PPU));
        assert_eq!(LogCategory::from_str("hdma"), Some(LogCategory::Dma));
        assert_eq!(LogCategory::from_str("irq"), Some(LogCategory::Interrupts));
        assert_eq!(LogCategory::from_str("bus"), Some(LogCategory::Bus));
        assert_eq!(LogCategory::from_str("apu"), None);
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::PPU, LogLevel::Debug);

        assert!(config.should_log(LogCategory::PPU, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::PPU, LogLevel::Trace));
        assert!(!config.should_log(LogCategory::Dma, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Dma, LogLevel::Error));
        assert!(!config.should_log(LogCategory::Dma, LogLevel::Off));
    }

    #[test]
    fn test_apply_filter() {
        let config = LogConfig::new();
        config.apply_filter("warn, ppu=trace,dma=info").unwrap();

        assert_eq!(config.get_global_level(), LogLevel::Warn);
        assert_eq!(config.get_level(LogCategory::PPU), LogLevel::Trace);
        assert_eq!(config.get_level(LogCategory::Dma), LogLevel::Info);
        assert_eq!(config.get_level(LogCategory::Bus), LogLevel::Off);
    }

    #[test]
    fn test_apply_filter_rejects_without_side_effects() {
        let config = LogConfig::new();
        assert_eq!(
            config.apply_filter("ppu=debug,cpu=trace"),
            Err(LogFilterError::UnknownCategory("cpu".to_string()))
        );
        assert_eq!(config.get_level(LogCategory::PPU), LogLevel::Off);
        assert_eq!(
            config.apply_filter("ppu=loud"),
            Err(LogFilterError::UnknownLevel("loud".to_string()))
        );
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Interrupts, LogLevel::Debug);
        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert!(LogCategory::ALL
            .iter()
            .all(|&c| config.get_level(c) == LogLevel::Off));
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(60);
        for _ in 0..60 {
            let (allowed, _) = limiter.should_allow(LogCategory::PPU);
            assert!(allowed);
        }
        let (allowed, dropped) = limiter.should_allow(LogCategory::PPU);
        assert!(!allowed);
        assert_eq!(dropped, Some(1));
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            limiter.should_allow(LogCategory::PPU);
        }
        assert!(!limiter.should_allow(LogCategory::PPU).0);
        assert!(limiter.should_allow(LogCategory::Dma).0);
    }

    #[test]
    fn test_rate_limiter_sliding_window() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            limiter.should_allow(LogCategory::Bus);
        }
        for _ in 0..4 {
            limiter.should_allow(LogCategory::Bus);
        }

        thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Bus);
        assert!(allowed, "window should have slid");
        // First drop was reported immediately, the remaining three now.
        assert_eq!(dropped, Some(3));
    }
}
