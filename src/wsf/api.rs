use std::time::Duration;

use curl::easy::Easy;

use crate::{
    config::Configuration,
    data_types::{route::TerminalId, vessel::VesselFix},
    error::TelemetryError,
    logvbln, logwarn,
    util::time::secs,
    wsf::{vessel_location::VesselLocation, TelemetrySource},
};

const WSF_VESSELS_URL: &str = "https://www.wsdot.wa.gov/ferries/api/vessels/rest/vessellocations";
const USER_AGENT: &str = concat!("ferry-progress/", env!("CARGO_PKG_VERSION"));

/// WSDOT Ferries vessel-locations client.
pub struct WsfClient {
    access_code: String,
    terminal: TerminalId,
    timeout: Duration,
    base_url: String,
}

impl WsfClient {
    const CC: &'static str = "WsfClient";

    pub fn new(access_code: &str, terminal: TerminalId, timeout: Duration) -> Self {
        Self {
            access_code: access_code.to_string(),
            terminal,
            timeout,
            base_url: WSF_VESSELS_URL.to_string(),
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        WsfClient::new(&config.access_code, config.terminal, secs(config.fetch_timeout))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn locations_url(&self) -> String {
        let access_code = Easy::new().url_encode(self.access_code.as_bytes());
        format!("{}?apiaccesscode={}", self.base_url, access_code)
    }

    fn get_request(url: &str, timeout: Duration) -> Result<Vec<u8>, TelemetryError> {
        let mut handle = Easy::new();
        handle.url(url)?;
        handle.get(true)?;
        handle.useragent(USER_AGENT)?;
        handle.timeout(timeout)?;

        let mut buffer_response = Vec::new();
        {
            let mut transfer = handle.transfer();
            transfer.write_function(|data| {
                buffer_response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = handle.response_code()?;
        if !(200..300).contains(&status) {
            return Err(TelemetryError::Status(status));
        }

        Ok(buffer_response)
    }

    /// Decodes a `vessellocations` payload, keeping in-service vessels that
    /// sail to or from `terminal`.
    pub fn parse_locations(&self, body: &[u8]) -> Result<Vec<VesselFix>, TelemetryError> {
        let locations: Vec<VesselLocation> = serde_json::from_slice(body)?;

        let fixes: Vec<VesselFix> = locations
            .iter()
            .filter(|location| location.in_service && location.touches_terminal(self.terminal))
            .filter_map(|location| {
                let fix = location.to_fix();
                if fix.is_none() {
                    logwarn!(
                        "Dropping {} ({}): unreadable timestamp {:?}",
                        location.vessel_name,
                        location.vessel_id,
                        location.time_stamp
                    );
                }
                fix
            })
            .collect();

        logvbln!(
            "{} of {} vessels serve terminal {}",
            fixes.len(),
            locations.len(),
            self.terminal
        );

        Ok(fixes)
    }
}

#[rocket::async_trait]
impl TelemetrySource for WsfClient {
    async fn fetch(&self) -> Result<Vec<VesselFix>, TelemetryError> {
        let url = self.locations_url();
        let timeout = self.timeout;

        let body = tokio::task::spawn_blocking(move || WsfClient::get_request(&url, timeout))
            .await
            .map_err(|e| TelemetryError::Worker(e.to_string()))??;

        self.parse_locations(&body)
    }
}
