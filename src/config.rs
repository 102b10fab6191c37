use std::{
    net::{IpAddr, Ipv4Addr, ToSocketAddrs},
    path::{Path, PathBuf},
};

use serde_derive::Deserialize;

use crate::{
    data_types::route::{ReferenceRoute, TerminalId, BAINBRIDGE_TERMINAL},
    error::FerryError,
    processors::fix_projector::DEFAULT_MAX_MATCH_DISTANCE_M,
    util::{
        logging::{self, LogLevel},
        time::MAX_PERIOD,
    },
};

pub const CONFIG_PATH_ENV: &str = "FERRY_CONFIG";
pub const ACCESS_CODE_ENV: &str = "FERRY_ACCESS_CODE";
const DEFAULT_CONFIG_PATH: &str = "ferry.toml";

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Silences every component, warnings excepted.
    pub quiet: bool,
    pub verbose: bool,
    /// Components whose informational messages are silenced.
    pub muted: Vec<String>,
    /// Components logged verbosely even when `verbose` is off.
    pub verbose_components: Vec<String>,
}

impl LoggingSettings {
    pub fn apply(&self) {
        logging::set_global_logging(!self.quiet);
        logging::set_global_level(if self.verbose {
            LogLevel::VERBOSE
        } else {
            LogLevel::INFO
        });

        self.verbose_components
            .iter()
            .for_each(|cc| logging::enable_cc(cc, LogLevel::VERBOSE));
        self.muted.iter().for_each(|cc| logging::disable_cc(cc));
    }
}

/// Everything tunable about the service. Times are in seconds, lengths in metres.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// WSDOT Traveler Information API access code.
    pub access_code: String,
    pub bind: String,
    /// Terminal whose arrivals and departures are tracked.
    pub terminal: TerminalId,

    pub update_frequency: f64,
    pub idle_after: f64,
    pub subdivided_segment_max_size: f64,
    pub minimum_ferries: usize,
    /// Negative disables staleness compensation.
    pub max_data_staleness: f64,
    pub min_update_interval: f64,
    pub fetch_timeout: f64,
    pub max_match_distance: f64,

    pub debug_mode: bool,
    pub debug_page_path: PathBuf,

    pub route: ReferenceRoute,
    pub logging: LoggingSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            access_code: String::new(),
            bind: "localhost:8000".to_string(),
            terminal: BAINBRIDGE_TERMINAL,
            update_frequency: 15.0,
            idle_after: 60.0,
            subdivided_segment_max_size: 10.0,
            minimum_ferries: 2,
            max_data_staleness: 18.0,
            min_update_interval: 2.0,
            fetch_timeout: 10.0,
            max_match_distance: DEFAULT_MAX_MATCH_DISTANCE_M,
            debug_mode: false,
            debug_page_path: PathBuf::from("./debug.html"),
            route: ReferenceRoute::seattle_bainbridge(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Configuration {
    /// Reads `$FERRY_CONFIG` (or `./ferry.toml`), falling back to defaults when
    /// the file does not exist, then applies environment overrides.
    pub fn load() -> Result<Self, FerryError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);

        let mut config = if path.exists() {
            Configuration::from_file(path)?
        } else {
            Configuration::default()
        };

        if let Ok(access_code) = std::env::var(ACCESS_CODE_ENV) {
            config.access_code = access_code;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, FerryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FerryError::Config(format!("unable to read {}: {}", path.display(), e)))?;

        Configuration::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, FerryError> {
        toml::from_str(content).map_err(|e| FerryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), FerryError> {
        if self.access_code.trim().is_empty() {
            return Err(FerryError::Config(format!(
                "an access code is required (set `access_code` or ${})",
                ACCESS_CODE_ENV
            )));
        }

        let positive = [
            ("update_frequency", self.update_frequency),
            ("idle_after", self.idle_after),
            ("subdivided_segment_max_size", self.subdivided_segment_max_size),
            ("min_update_interval", self.min_update_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("max_match_distance", self.max_match_distance),
        ];

        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(FerryError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }

        let periods = [
            ("update_frequency", self.update_frequency),
            ("idle_after", self.idle_after),
            ("min_update_interval", self.min_update_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("max_data_staleness", self.max_data_staleness),
        ];

        let max_period = MAX_PERIOD.as_secs_f64();
        for (name, value) in periods {
            if value.is_nan() || value > max_period {
                return Err(FerryError::Config(format!(
                    "{} must be at most {} seconds, got {}",
                    name, max_period, value
                )));
            }
        }

        self.bind_address()?;
        Ok(())
    }

    pub fn staleness_compensation(&self) -> bool {
        self.max_data_staleness >= 0.0
    }

    /// `bind` split into the address and port the HTTP server listens on.
    pub fn bind_address(&self) -> Result<(IpAddr, u16), FerryError> {
        let (host, port) = self
            .bind
            .rsplit_once(':')
            .ok_or_else(|| FerryError::Config(format!("bind `{}` is not host:port", self.bind)))?;

        let port: u16 = port
            .parse()
            .map_err(|_| FerryError::Config(format!("bind `{}` has an invalid port", self.bind)))?;

        let address = match host {
            "" => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            host => match host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
                Ok(address) => address,
                Err(_) => (host, port)
                    .to_socket_addrs()
                    .ok()
                    .and_then(|mut addrs| addrs.next())
                    .map(|addr| addr.ip())
                    .ok_or_else(|| FerryError::Config(format!("cannot resolve bind host `{}`", host)))?,
            },
        };

        Ok((address, port))
    }
}
