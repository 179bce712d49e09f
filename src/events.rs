use crate::cayenne::CayenneLpp;
use crate::lineproto::{node_from_json, EncodeError, Node};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 64-bit device EUI, rendered as lowercase hex on every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevEui([u8; 8]);

impl DevEui {
    #[cfg(test)]
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DevEui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DevEui {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let bytes = hex::decode(raw.trim()).context("dev EUI is not hex")?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("dev EUI must be 8 bytes"))?;
        Ok(Self(bytes))
    }
}

impl Serialize for DevEui {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DevEui {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-bit device address, lowercase hex like the EUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevAddr([u8; 4]);

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DevAddr {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let bytes = hex::decode(raw.trim()).context("dev addr is not hex")?;
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("dev addr must be 4 bytes"))?;
        Ok(Self(bytes))
    }
}

impl Serialize for DevAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DevAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RxInfo {
    #[serde(default, rename = "gatewayID")]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    pub rssi: i32,
    #[serde(rename = "loRaSNR")]
    pub lo_ra_snr: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
    pub frequency: u64,
    pub dr: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UplinkEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    #[serde(default)]
    pub rx_info: Vec<RxInfo>,
    pub tx_info: TxInfo,
    #[serde(default)]
    pub adr: bool,
    pub f_cnt: u32,
    pub f_port: u8,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub object: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    #[serde(default)]
    pub battery: Option<u32>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub battery_level_unavailable: bool,
    #[serde(default)]
    pub external_power_source: bool,
    #[serde(default)]
    pub margin: Option<i32>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    pub dev_addr: DevAddr,
    #[serde(default)]
    pub dr: Option<u8>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    pub acknowledged: bool,
    #[serde(default)]
    pub f_cnt: u32,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    #[serde(rename = "type")]
    pub error_type: String,
    pub error: String,
    #[serde(default)]
    pub f_cnt: u32,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    #[serde(default, rename = "applicationID")]
    pub application_id: Option<String>,
    pub application_name: String,
    pub device_name: String,
    #[serde(rename = "devEUI")]
    pub dev_eui: DevEui,
    pub location: Location,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Up(UplinkEvent),
    Join(JoinEvent),
    Ack(AckEvent),
    Error(ErrorEvent),
    Status(StatusEvent),
    Location(LocationEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Up(_) => "up",
            Event::Join(_) => "join",
            Event::Ack(_) => "ack",
            Event::Error(_) => "error",
            Event::Status(_) => "status",
            Event::Location(_) => "location",
        }
    }

    pub fn dev_eui(&self) -> DevEui {
        match self {
            Event::Up(event) => event.dev_eui,
            Event::Join(event) => event.dev_eui,
            Event::Ack(event) => event.dev_eui,
            Event::Error(event) => event.dev_eui,
            Event::Status(event) => event.dev_eui,
            Event::Location(event) => event.dev_eui,
        }
    }

    /// Decodes one event body by kind. Unknown kinds are skipped, not errors:
    /// the network server may grow event types we do not forward.
    pub fn decode(kind: &str, payload: &[u8]) -> Result<Option<Event>> {
        let event = match kind {
            "up" => Event::Up(serde_json::from_slice(payload).context("decode uplink event")?),
            "join" => Event::Join(serde_json::from_slice(payload).context("decode join event")?),
            "ack" => Event::Ack(serde_json::from_slice(payload).context("decode ack event")?),
            "error" => Event::Error(serde_json::from_slice(payload).context("decode error event")?),
            "status" => {
                Event::Status(serde_json::from_slice(payload).context("decode status event")?)
            }
            "location" => {
                Event::Location(serde_json::from_slice(payload).context("decode location event")?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// The uplink payload in one of its two enumerable shapes. Both expose the
/// same node tree to the flattener, so downstream code never inspects the
/// concrete payload type.
#[derive(Debug, Clone)]
pub enum DecodedObject {
    Json(serde_json::Map<String, serde_json::Value>),
    CayenneLpp(CayenneLpp),
}

impl DecodedObject {
    pub fn node(&self) -> Result<Node, EncodeError> {
        match self {
            DecodedObject::Json(map) => {
                let mut children = std::collections::BTreeMap::new();
                for (key, value) in map {
                    if let Some(node) = node_from_json(value, key)? {
                        children.insert(key.clone(), node);
                    }
                }
                Ok(Node::Object(children))
            }
            DecodedObject::CayenneLpp(lpp) => Ok(lpp.node()),
        }
    }
}

impl UplinkEvent {
    /// Resolves the payload to flatten: the pre-decoded JSON object when the
    /// event carries one, otherwise a Cayenne LPP decode of the raw frame
    /// when the configured LPP port matches. Anything else means there is no
    /// structured payload to write.
    pub fn decoded_object(&self, lpp_port: Option<u8>) -> Result<Option<DecodedObject>> {
        if let Some(object) = &self.object {
            return match object {
                serde_json::Value::Object(map) => Ok(Some(DecodedObject::Json(map.clone()))),
                serde_json::Value::Null => Ok(None),
                _ => Err(anyhow::anyhow!("uplink object is not a JSON object")),
            };
        }

        if let (Some(data), Some(port)) = (&self.data, lpp_port) {
            if self.f_port == port {
                let frame = STANDARD.decode(data).context("uplink data is not base64")?;
                let lpp = CayenneLpp::decode(&frame).context("decode cayenne lpp frame")?;
                return Ok(Some(DecodedObject::CayenneLpp(lpp)));
            }
        }

        Ok(None)
    }
}
