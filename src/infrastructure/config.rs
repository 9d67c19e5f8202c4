use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub influx: InfluxSettings,
    #[serde(default)]
    pub query: QuerySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    #[serde(default = "default_retention_policy")]
    pub retention_policy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    #[serde(default = "default_measurement")]
    pub measurement: String,
    #[serde(default = "default_device_tag")]
    pub device_tag: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl QuerySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            measurement: default_measurement(),
            device_tag: default_device_tag(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_retention_policy() -> String {
    "autogen".to_string()
}

fn default_measurement() -> String {
    "telemetry".to_string()
}

fn default_device_tag() -> String {
    "device_id".to_string()
}

fn default_timeout_secs() -> u64 {
    90
}

/// Optional `config/telemetry.*` file, overridden by `TELEMETRY__SECTION__KEY` variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/telemetry").required(false))
        .add_source(
            config::Environment::with_prefix("TELEMETRY")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${var}` placeholders in a single left-to-right pass. Substituted values are
/// never rescanned, and unknown placeholders are left as they are.
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(open) = rest.find("${") {
        result.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            result.push_str(&rest[open..]);
            return result;
        };
        match vars.get(&after[..close]) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[open..open + close + 3]),
        }
        rest = &after[close + 1..];
    }
    result.push_str(rest);
    result
}
