use crate::lineproto::{Node, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const LPP_DIGITAL_INPUT: u8 = 0;
const LPP_DIGITAL_OUTPUT: u8 = 1;
const LPP_ANALOG_INPUT: u8 = 2;
const LPP_ANALOG_OUTPUT: u8 = 3;
const LPP_ILLUMINANCE: u8 = 101;
const LPP_PRESENCE: u8 = 102;
const LPP_TEMPERATURE: u8 = 103;
const LPP_HUMIDITY: u8 = 104;
const LPP_ACCELEROMETER: u8 = 113;
const LPP_BAROMETER: u8 = 115;
const LPP_GYROMETER: u8 = 134;
const LPP_GPS_LOCATION: u8 = 136;

#[derive(Debug, Error)]
pub enum CayenneError {
    #[error("unexpected end of frame in channel {channel} (type {lpp_type})")]
    UnexpectedEnd { channel: u8, lpp_type: u8 },
    #[error("unknown data type {lpp_type} in channel {channel}")]
    UnknownType { channel: u8, lpp_type: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A decoded Cayenne LPP frame, channel-keyed per sensor kind. BTreeMaps keep
/// channel enumeration deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CayenneLpp {
    pub digital_input: BTreeMap<u8, u8>,
    pub digital_output: BTreeMap<u8, u8>,
    pub analog_input: BTreeMap<u8, f64>,
    pub analog_output: BTreeMap<u8, f64>,
    pub illuminance: BTreeMap<u8, u16>,
    pub presence: BTreeMap<u8, u8>,
    pub temperature: BTreeMap<u8, f64>,
    pub humidity: BTreeMap<u8, f64>,
    pub accelerometer: BTreeMap<u8, Axes>,
    pub barometer: BTreeMap<u8, f64>,
    pub gyrometer: BTreeMap<u8, Axes>,
    pub gps_location: BTreeMap<u8, GpsLocation>,
}

impl CayenneLpp {
    pub fn decode(frame: &[u8]) -> Result<Self, CayenneError> {
        let mut decoded = Self::default();
        let mut rest = frame;

        while rest.len() >= 2 {
            let channel = rest[0];
            let lpp_type = rest[1];
            rest = &rest[2..];

            let needed = payload_len(channel, lpp_type)?;
            if rest.len() < needed {
                return Err(CayenneError::UnexpectedEnd { channel, lpp_type });
            }
            let data = &rest[..needed];
            rest = &rest[needed..];

            match lpp_type {
                LPP_DIGITAL_INPUT => {
                    decoded.digital_input.insert(channel, data[0]);
                }
                LPP_DIGITAL_OUTPUT => {
                    decoded.digital_output.insert(channel, data[0]);
                }
                LPP_ANALOG_INPUT => {
                    decoded
                        .analog_input
                        .insert(channel, i16_be(data, 0) as f64 / 100.0);
                }
                LPP_ANALOG_OUTPUT => {
                    decoded
                        .analog_output
                        .insert(channel, i16_be(data, 0) as f64 / 100.0);
                }
                LPP_ILLUMINANCE => {
                    decoded
                        .illuminance
                        .insert(channel, u16::from_be_bytes([data[0], data[1]]));
                }
                LPP_PRESENCE => {
                    decoded.presence.insert(channel, data[0]);
                }
                LPP_TEMPERATURE => {
                    decoded
                        .temperature
                        .insert(channel, i16_be(data, 0) as f64 / 10.0);
                }
                LPP_HUMIDITY => {
                    decoded.humidity.insert(channel, data[0] as f64 / 2.0);
                }
                LPP_ACCELEROMETER => {
                    decoded.accelerometer.insert(
                        channel,
                        Axes {
                            x: i16_be(data, 0) as f64 / 1000.0,
                            y: i16_be(data, 2) as f64 / 1000.0,
                            z: i16_be(data, 4) as f64 / 1000.0,
                        },
                    );
                }
                LPP_BAROMETER => {
                    decoded
                        .barometer
                        .insert(channel, u16::from_be_bytes([data[0], data[1]]) as f64 / 10.0);
                }
                LPP_GYROMETER => {
                    decoded.gyrometer.insert(
                        channel,
                        Axes {
                            x: i16_be(data, 0) as f64 / 100.0,
                            y: i16_be(data, 2) as f64 / 100.0,
                            z: i16_be(data, 4) as f64 / 100.0,
                        },
                    );
                }
                LPP_GPS_LOCATION => {
                    decoded.gps_location.insert(
                        channel,
                        GpsLocation {
                            latitude: i24_be(data, 0) as f64 / 10000.0,
                            longitude: i24_be(data, 3) as f64 / 10000.0,
                            altitude: i24_be(data, 6) as f64 / 100.0,
                        },
                    );
                }
                _ => unreachable!("payload_len rejects unknown types"),
            }
        }

        if !rest.is_empty() {
            return Err(CayenneError::UnexpectedEnd {
                channel: rest[0],
                lpp_type: 0,
            });
        }

        Ok(decoded)
    }

    /// Enumerates the frame as a payload tree: scalar channels become leaves
    /// keyed `<kind>_<channel>`, composite channels become sub-objects so the
    /// flattener applies its usual rules (gps latitude/longitude combine,
    /// altitude stays separate).
    pub fn node(&self) -> Node {
        let mut root = BTreeMap::new();

        for (channel, value) in &self.digital_input {
            root.insert(
                format!("digital_input_{channel}"),
                Node::Leaf(Value::Integer(*value as i64)),
            );
        }
        for (channel, value) in &self.digital_output {
            root.insert(
                format!("digital_output_{channel}"),
                Node::Leaf(Value::Integer(*value as i64)),
            );
        }
        for (channel, value) in &self.analog_input {
            root.insert(
                format!("analog_input_{channel}"),
                Node::Leaf(Value::Float(*value)),
            );
        }
        for (channel, value) in &self.analog_output {
            root.insert(
                format!("analog_output_{channel}"),
                Node::Leaf(Value::Float(*value)),
            );
        }
        for (channel, value) in &self.illuminance {
            root.insert(
                format!("illuminance_{channel}"),
                Node::Leaf(Value::Integer(*value as i64)),
            );
        }
        for (channel, value) in &self.presence {
            root.insert(
                format!("presence_{channel}"),
                Node::Leaf(Value::Integer(*value as i64)),
            );
        }
        for (channel, value) in &self.temperature {
            root.insert(
                format!("temperature_{channel}"),
                Node::Leaf(Value::Float(*value)),
            );
        }
        for (channel, value) in &self.humidity {
            root.insert(
                format!("humidity_{channel}"),
                Node::Leaf(Value::Float(*value)),
            );
        }
        for (channel, axes) in &self.accelerometer {
            root.insert(format!("accelerometer_{channel}"), axes_node(axes));
        }
        for (channel, value) in &self.barometer {
            root.insert(
                format!("barometer_{channel}"),
                Node::Leaf(Value::Float(*value)),
            );
        }
        for (channel, axes) in &self.gyrometer {
            root.insert(format!("gyrometer_{channel}"), axes_node(axes));
        }
        for (channel, gps) in &self.gps_location {
            let mut fields = BTreeMap::new();
            fields.insert("latitude".to_string(), Node::Leaf(Value::Float(gps.latitude)));
            fields.insert(
                "longitude".to_string(),
                Node::Leaf(Value::Float(gps.longitude)),
            );
            fields.insert("altitude".to_string(), Node::Leaf(Value::Float(gps.altitude)));
            root.insert(format!("gps_location_{channel}"), Node::Object(fields));
        }

        Node::Object(root)
    }
}

fn axes_node(axes: &Axes) -> Node {
    let mut fields = BTreeMap::new();
    fields.insert("x".to_string(), Node::Leaf(Value::Float(axes.x)));
    fields.insert("y".to_string(), Node::Leaf(Value::Float(axes.y)));
    fields.insert("z".to_string(), Node::Leaf(Value::Float(axes.z)));
    Node::Object(fields)
}

fn payload_len(channel: u8, lpp_type: u8) -> Result<usize, CayenneError> {
    match lpp_type {
        LPP_DIGITAL_INPUT | LPP_DIGITAL_OUTPUT | LPP_PRESENCE | LPP_HUMIDITY => Ok(1),
        LPP_ANALOG_INPUT | LPP_ANALOG_OUTPUT | LPP_ILLUMINANCE | LPP_TEMPERATURE
        | LPP_BAROMETER => Ok(2),
        LPP_ACCELEROMETER | LPP_GYROMETER => Ok(6),
        LPP_GPS_LOCATION => Ok(9),
        _ => Err(CayenneError::UnknownType { channel, lpp_type }),
    }
}

fn i16_be(data: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

// 24-bit big-endian two's complement.
fn i24_be(data: &[u8], offset: usize) -> i32 {
    let raw =
        ((data[offset] as i32) << 16) | ((data[offset + 1] as i32) << 8) | (data[offset + 2] as i32);
    if raw & 0x0080_0000 != 0 {
        raw - 0x0100_0000
    } else {
        raw
    }
}
