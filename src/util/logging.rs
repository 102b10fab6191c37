use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub(crate) static LOGGER_CONFIG: Lazy<RwLock<LoggingConfig>> =
    Lazy::new(|| RwLock::new(LoggingConfig::default()));

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub enum LogLevel {
    INFO,
    VERBOSE,
}

#[macro_export]
macro_rules! logln {
    ($fmt:literal) => {
        if $crate::util::logging::is_enabled(Self::CC) {
            tracing::info!(component = Self::CC, $fmt);
        }
    };
    ($fmt:literal, $($arg:tt)*) => {
        if $crate::util::logging::is_enabled(Self::CC) {
            tracing::info!(component = Self::CC, $fmt, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! logvbln {
    ($fmt:literal) => {
        if $crate::util::logging::is_enabled(Self::CC)
            && $crate::util::logging::is_at_level(Self::CC, $crate::util::logging::LogLevel::VERBOSE)
        {
            tracing::info!(component = Self::CC, verbose = true, $fmt);
        }
    };
    ($fmt:literal, $($arg:tt)*) => {
        if $crate::util::logging::is_enabled(Self::CC)
            && $crate::util::logging::is_at_level(Self::CC, $crate::util::logging::LogLevel::VERBOSE)
        {
            tracing::info!(component = Self::CC, verbose = true, $fmt, $($arg)*);
        }
    };
}

// Warnings ignore the per-component mute list.
#[macro_export]
macro_rules! logwarn {
    ($fmt:literal) => {
        tracing::warn!(component = Self::CC, $fmt)
    };
    ($fmt:literal, $($arg:tt)*) => {
        tracing::warn!(component = Self::CC, $fmt, $($arg)*)
    };
}

pub fn is_enabled(cc: &'static str) -> bool {
    LOGGER_CONFIG.read().cc_enabled(cc)
}

pub fn is_at_level(cc: &'static str, level: LogLevel) -> bool {
    LOGGER_CONFIG.read().cc_at_level(cc, level)
}

pub fn disable_cc(cc: &str) {
    LOGGER_CONFIG.write().disable_cc(cc);
}

pub fn enable_cc(cc: &str, level: LogLevel) {
    LOGGER_CONFIG.write().enable_cc(cc, level);
}

pub fn set_global_logging(enabled: bool) {
    let mut config = LOGGER_CONFIG.write();
    if enabled {
        config.enable_global_tracing();
    } else {
        config.disable_global_tracing();
    }
}

pub fn set_global_level(level: LogLevel) {
    LOGGER_CONFIG.write().set_global_level(level);
}

// Verbose component lines are gated by the component table and emitted at
// info, so only dependencies and benchmarks depend on this level.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "debug,rocket=info"
    } else {
        "info,rocket=warn"
    }
}

/// Installs the `tracing` subscriber. `RUST_LOG` wins over the verbose flag.
pub fn init_subscriber(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives(verbose)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub struct LoggingConfig {
    global_tracing_enabled: bool,
    global_level: LogLevel,
    flags: HashMap<String, (bool, LogLevel)>, // <component, (tracing enabled, trace level)>
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_tracing_enabled: true,
            global_level: LogLevel::INFO,
            flags: Default::default(),
        }
    }
}

impl LoggingConfig {
    pub fn cc_enabled(&self, cc: &str) -> bool {
        if !self.global_tracing_enabled {
            return false;
        }

        self.flags.get(cc).map_or(true, |flag| flag.0)
    }

    pub fn cc_at_level(&self, cc: &str, level: LogLevel) -> bool {
        if self.global_level >= level {
            return true;
        }

        self.flags.get(cc).map_or(false, |flag| flag.1 >= level)
    }

    pub fn enable_cc(&mut self, cc: &str, level: LogLevel) {
        self.flags.insert(cc.to_string(), (true, level));
    }

    pub fn disable_cc(&mut self, cc: &str) {
        self.flags.insert(cc.to_string(), (false, LogLevel::INFO));
    }

    pub fn enable_global_tracing(&mut self) {
        self.global_tracing_enabled = true;
    }

    pub fn disable_global_tracing(&mut self) {
        self.global_tracing_enabled = false;
    }

    pub fn set_global_level(&mut self, level: LogLevel) {
        self.global_level = level;
    }
}
