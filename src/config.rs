use crate::influx::InfluxConfig;
use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_client_id: String,
    pub mqtt_keepalive_secs: u64,

    pub http_bind: String,
    pub max_queue: usize,

    pub influx_enabled: bool,
    pub influx_endpoint: String,
    pub influx_db: String,
    pub influx_username: Option<String>,
    pub influx_password: Option<String>,
    pub influx_retention_policy: String,
    pub influx_precision: String,

    pub publish_enabled: bool,
    pub publish_topic_prefix: String,
    pub publish_client_id: String,

    pub cayenne_lpp_port: Option<u8>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mqtt_url = env_string("FORWARDER_MQTT_URL", Some("mqtt://127.0.0.1:1883".to_string()))?;
        let url = Url::parse(&mqtt_url).context("invalid FORWARDER_MQTT_URL")?;
        let mqtt_host = url
            .host_str()
            .ok_or_else(|| anyhow!("FORWARDER_MQTT_URL missing host"))?
            .to_string();
        let mqtt_port = url.port().unwrap_or(1883);

        let mqtt_username = env_optional("FORWARDER_MQTT_USERNAME");
        let mqtt_password = env_optional("FORWARDER_MQTT_PASSWORD");
        let mqtt_topic_prefix =
            env_string("FORWARDER_MQTT_TOPIC_PREFIX", Some("lorawan".to_string()))?;
        let mqtt_client_id = env_string(
            "FORWARDER_MQTT_CLIENT_ID",
            Some(format!("lora-event-forwarder-{}", std::process::id())),
        )?;
        let mqtt_keepalive_secs = env_u64("FORWARDER_MQTT_KEEPALIVE_SECS", Some(30))?;

        let http_bind = env_string("FORWARDER_HTTP_BIND", Some("127.0.0.1:9104".to_string()))?;
        let max_queue = env_u64("FORWARDER_MAX_QUEUE", Some(10_000))? as usize;

        let influx_enabled = env_bool("FORWARDER_INFLUX_ENABLED", true);
        let influx_endpoint = env_string(
            "FORWARDER_INFLUX_ENDPOINT",
            Some("http://127.0.0.1:8086/write".to_string()),
        )?;
        if influx_enabled {
            Url::parse(&influx_endpoint).context("invalid FORWARDER_INFLUX_ENDPOINT")?;
        }
        let influx_db = env_string("FORWARDER_INFLUX_DB", Some("lorawan".to_string()))?;
        let influx_username = env_optional("FORWARDER_INFLUX_USERNAME");
        let influx_password = env_optional("FORWARDER_INFLUX_PASSWORD");
        let influx_retention_policy =
            env_string("FORWARDER_INFLUX_RETENTION_POLICY", Some("autogen".to_string()))?;
        let influx_precision = env_string("FORWARDER_INFLUX_PRECISION", Some("s".to_string()))?;

        let publish_enabled = env_bool("FORWARDER_PUBLISH_ENABLED", false);
        let publish_topic_prefix =
            env_string("FORWARDER_PUBLISH_TOPIC_PREFIX", Some("forwarder".to_string()))?;
        let publish_client_id = env_string(
            "FORWARDER_PUBLISH_CLIENT_ID",
            Some(format!("{mqtt_client_id}-publish")),
        )?;

        let cayenne_lpp_port = match env_optional("FORWARDER_CAYENNE_LPP_PORT") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u8>()
                    .context("invalid FORWARDER_CAYENNE_LPP_PORT")?,
            ),
            None => None,
        };

        Ok(Self {
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_client_id,
            mqtt_keepalive_secs,
            http_bind,
            max_queue,
            influx_enabled,
            influx_endpoint,
            influx_db,
            influx_username,
            influx_password,
            influx_retention_policy,
            influx_precision,
            publish_enabled,
            publish_topic_prefix,
            publish_client_id,
            cayenne_lpp_port,
        })
    }

    pub fn mqtt_keepalive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keepalive_secs)
    }

    pub fn influx(&self) -> InfluxConfig {
        InfluxConfig {
            endpoint: self.influx_endpoint.clone(),
            db: self.influx_db.clone(),
            username: self.influx_username.clone(),
            password: self.influx_password.clone(),
            retention_policy: self.influx_retention_policy.clone(),
            precision: self.influx_precision.clone(),
        }
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
