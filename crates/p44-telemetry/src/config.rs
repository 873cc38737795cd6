//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Node name, for telling nodes apart in aggregated logs.
    pub node_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error or per-target).
    pub log_level: String,

    /// Emit logs to stdout at all.
    pub console_output: bool,

    /// JSON lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "p44-validator".to_string(),
            node_name: "p44-node".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Read the configuration from the process environment.
    ///
    /// - `P44_SERVICE_NAME` (default: p44-validator)
    /// - `P44_NODE_NAME` (default: p44-node)
    /// - `P44_LOG_LEVEL` or `RUST_LOG` (default: info)
    /// - `P44_CONSOLE_OUTPUT` (default: true)
    /// - `P44_JSON_LOGS` (default: true inside containers)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("P44_SERVICE_NAME").unwrap_or(defaults.service_name),
            node_name: lookup("P44_NODE_NAME").unwrap_or(defaults.node_name),
            log_level: lookup("P44_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: lookup("P44_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),
            json_logs: lookup("P44_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config.service_name, "p44-validator");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_overrides() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warn"),
            ("P44_LOG_LEVEL", "p44_02_indexer=debug,info"),
            ("P44_JSON_LOGS", "1"),
            ("P44_CONSOLE_OUTPUT", "false"),
        ]));
        assert_eq!(config.log_level, "p44_02_indexer=debug,info");
        assert!(config.json_logs);
        assert!(!config.console_output);

        let config = TelemetryConfig::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_container_defaults_to_json() {
        let config = TelemetryConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1")]));
        assert!(config.json_logs);
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("DOCKER_CONTAINER", "1"),
            ("P44_JSON_LOGS", "false"),
        ]));
        assert!(!config.json_logs);
    }
}
