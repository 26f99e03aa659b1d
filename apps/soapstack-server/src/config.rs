//! Host configuration.
//!
//! Values are loaded from environment variables via [`HostConfig::from_env`].

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Host configuration for the local SOAP server.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Bind address (e.g. `"0.0.0.0:4580"`).
    #[builder(default = String::from("0.0.0.0:4580"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Log request and response payloads.
    #[builder(default = false)]
    pub debug: bool,

    /// Read the calculator WSDL from this file instead of the bundled copy.
    #[builder(default, setter(strip_option))]
    pub calculator_wsdl_path: Option<String>,

    /// When set, requests must carry a matching `x-api-key` header.
    #[builder(default, setter(strip_option))]
    pub api_key: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:4580"),
            log_level: String::from("info"),
            debug: false,
            calculator_wsdl_path: None,
            api_key: None,
        }
    }
}

impl HostConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4580` |
    /// | `LOG_LEVEL` | `info` (`debug` when `SOAP_DEBUG` is set and `LOG_LEVEL` is not) |
    /// | `SOAP_DEBUG` | `false` |
    /// | `CALCULATOR_WSDL_PATH` | *(bundled WSDL)* |
    /// | `SOAP_API_KEY` | *(no authorization)* |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("SOAP_DEBUG") {
            config.debug = parse_bool(&v);
            if config.debug {
                config.log_level = String::from("debug");
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("CALCULATOR_WSDL_PATH") {
            if !v.is_empty() {
                config.calculator_wsdl_path = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SOAP_API_KEY") {
            if !v.is_empty() {
                config.api_key = Some(v);
            }
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
