use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::extractor::ExtractOptions;
use crate::fetcher::FetchConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 120;

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub fetch: FetchConfig,
    pub extract: ExtractOptions,
    pub cors: CorsOrigins,
    /// Echo the fetched document in the `html` field of scrape responses.
    pub include_html: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::from([127, 0, 0, 1]), DEFAULT_PORT),
            fetch: FetchConfig::default(),
            extract: ExtractOptions::default(),
            cors: CorsOrigins::Any,
            include_html: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, applying defaults
    /// for anything the source does not define.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip = IpAddr::from_str(host.trim())
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match lookup("FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    AppError::ConfigError(format!("Invalid FETCH_TIMEOUT_SECS: {}", e))
                })?;
                if secs == 0 || secs > MAX_TIMEOUT_SECS {
                    return Err(AppError::ConfigError(format!(
                        "Invalid FETCH_TIMEOUT_SECS: must be between 1 and {}",
                        MAX_TIMEOUT_SECS
                    )));
                }
                secs
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut fetch = FetchConfig {
            timeout: Duration::from_secs(timeout_secs),
            accept_invalid_certs: parse_flag(&lookup, "TLS_ACCEPT_INVALID_CERTS")?,
            ..FetchConfig::default()
        };
        if let Some(user_agent) = lookup("SCRAPER_USER_AGENT").filter(|ua| !ua.trim().is_empty()) {
            fetch.headers.user_agent = user_agent.trim().to_string();
        }

        let extract = ExtractOptions {
            strip_navigation: parse_flag(&lookup, "STRIP_NAVIGATION")?,
        };

        let cors = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect();
                if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
                    CorsOrigins::Any
                } else {
                    CorsOrigins::List(origins)
                }
            }
            None => CorsOrigins::Any,
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            fetch,
            extract,
            cors,
            include_html: parse_flag(&lookup, "INCLUDE_RAW_HTML")?,
        })
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::ConfigError(format!(
            "Invalid {}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:5000");
        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert!(!config.fetch.accept_invalid_certs);
        assert!(!config.extract.strip_navigation);
        assert!(!config.include_html);
        assert_eq!(config.cors, CorsOrigins::Any);
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("FETCH_TIMEOUT_SECS", "20"),
            ("SCRAPER_USER_AGENT", "TestAgent/1.0"),
            ("TLS_ACCEPT_INVALID_CERTS", "true"),
            ("STRIP_NAVIGATION", "yes"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, http://127.0.0.1:5500"),
            ("INCLUDE_RAW_HTML", "1"),
        ])
        .unwrap();

        assert_eq!(config.server_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.fetch.timeout, Duration::from_secs(20));
        assert_eq!(config.fetch.headers.user_agent, "TestAgent/1.0");
        assert!(config.fetch.accept_invalid_certs);
        assert!(config.extract.strip_navigation);
        assert!(config.include_html);
        assert_eq!(
            config.cors,
            CorsOrigins::List(vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ])
        );
    }

    #[test]
    fn wildcard_origin_means_any() {
        let config = config_from(&[("CORS_ALLOWED_ORIGINS", "*")]).unwrap();
        assert_eq!(config.cors, CorsOrigins::Any);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(err.to_string().contains("Invalid port"));
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        assert!(config_from(&[("FETCH_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("FETCH_TIMEOUT_SECS", "500")]).is_err());
    }

    #[test]
    fn accepts_timeouts_up_to_two_minutes() {
        let config = config_from(&[("FETCH_TIMEOUT_SECS", "120")]).unwrap();
        assert_eq!(config.fetch.timeout, Duration::from_secs(120));
        let config = config_from(&[("FETCH_TIMEOUT_SECS", "1")]).unwrap();
        assert_eq!(config.fetch.timeout, Duration::from_secs(1));
    }

    #[test]
    fn rejects_unrecognised_flag() {
        let err = config_from(&[("TLS_ACCEPT_INVALID_CERTS", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("TLS_ACCEPT_INVALID_CERTS"));
    }
}
