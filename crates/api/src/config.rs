use std::time::Duration;

use homefix_gateway::GatewayEndpoints;

use crate::engine::DispatchSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development next to the
/// collaborator services. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Service catalogue base URL.
    pub service_api_url: String,
    /// Technician directory base URL.
    pub technician_api_url: String,
    /// Booking store base URL.
    pub booking_api_url: String,
    /// Bound on every collaborator call, in milliseconds (default: `3000`).
    pub gateway_timeout_ms: u64,
    /// One-time code accepted by OTP verification.
    pub otp_code: String,
    /// Interval between WebSocket pings in seconds (default: `30`).
    pub heartbeat_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                              |
    /// |---------------------------|--------------------------------------|
    /// | `HOST`                    | `0.0.0.0`                            |
    /// | `PORT`                    | `5000`                               |
    /// | `CORS_ORIGINS`            | `http://localhost:8081`              |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                                 |
    /// | `SERVICE_API_URL`         | `http://127.0.0.1:5003/services`     |
    /// | `TECHNICIAN_API_URL`      | `http://127.0.0.1:5002/technicians`  |
    /// | `BOOKING_API_URL`         | `http://127.0.0.1:5004/bookings`     |
    /// | `GATEWAY_TIMEOUT_MS`      | `3000`                               |
    /// | `OTP_CODE`                | `123456`                             |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                                 |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "5000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:8081")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let gateway_timeout_ms: u64 = env_or("GATEWAY_TIMEOUT_MS", "3000")
            .parse()
            .expect("GATEWAY_TIMEOUT_MS must be a valid u64");

        let heartbeat_interval_secs: u64 = env_or("HEARTBEAT_INTERVAL_SECS", "30")
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            service_api_url: trim_slash(env_or("SERVICE_API_URL", "http://127.0.0.1:5003/services")),
            technician_api_url: trim_slash(env_or(
                "TECHNICIAN_API_URL",
                "http://127.0.0.1:5002/technicians",
            )),
            booking_api_url: trim_slash(env_or("BOOKING_API_URL", "http://127.0.0.1:5004/bookings")),
            gateway_timeout_ms,
            otp_code: env_or("OTP_CODE", "123456"),
            heartbeat_interval_secs,
        }
    }

    pub fn gateway_endpoints(&self) -> GatewayEndpoints {
        GatewayEndpoints {
            service_api_url: self.service_api_url.clone(),
            technician_api_url: self.technician_api_url.clone(),
            booking_api_url: self.booking_api_url.clone(),
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            lookup_timeout: self.gateway_timeout(),
            otp_code: self.otp_code.clone(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
