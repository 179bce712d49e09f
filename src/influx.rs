use crate::events::{
    AckEvent, DecodedObject, DevEui, ErrorEvent, Event, JoinEvent, RxInfo, StatusEvent, UplinkEvent,
};
use crate::lineproto::{flatten, render_body, Point, TagSet, Value};
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub endpoint: String,
    pub db: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub retention_policy: String,
    pub precision: String,
}

/// Time-series sink: encodes an event into a line-protocol body and POSTs it
/// to the v1 write endpoint. Encoding is pure; delivery is one POST per
/// event with no retry here (the source re-delivers at QoS 1).
pub struct InfluxSink {
    config: InfluxConfig,
    client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn write_body(&self, body: String) -> Result<()> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .query(&[
                ("db", self.config.db.as_str()),
                ("rp", self.config.retention_policy.as_str()),
                ("precision", self.config.precision.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        let response = request.send().await.context("influxdb write request")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("influxdb write returned {status}");
        }
        Ok(())
    }
}

/// Encodes one event into its line-protocol body. `Ok(None)` means the event
/// kind produces no points (location events, or a status event with no known
/// fields present).
pub fn encode_event(event: &Event, lpp_port: Option<u8>) -> Result<Option<String>> {
    let points = match event {
        Event::Up(up) => {
            let object = up.decoded_object(lpp_port)?;
            uplink_points(up, object.as_ref())?
        }
        Event::Status(status) => status_points(status),
        Event::Join(join) => join_points(join),
        Event::Ack(ack) => ack_points(ack),
        Event::Error(error) => error_points(error),
        Event::Location(_) => Vec::new(),
    };

    let body = render_body(points);
    if body.is_empty() {
        Ok(None)
    } else {
        Ok(Some(body))
    }
}

pub fn uplink_points(up: &UplinkEvent, object: Option<&DecodedObject>) -> Result<Vec<Point>> {
    let mut points = Vec::new();

    if let Some(object) = object {
        let node = object.node()?;
        let mut tags = identity_tags(&up.application_name, &up.device_name, up.dev_eui);
        tags.insert("f_port", up.f_port.to_string());
        tags.merge_user_tags(&up.tags);

        for leaf in flatten(&node) {
            let mut point = Point::new(
                format!("device_frmpayload_data_{}", leaf.joined_path()),
                tags.clone(),
            );
            for (key, value) in leaf.fields {
                point.field(&key, value);
            }
            points.push(point);
        }
    }

    let mut tags = identity_tags(&up.application_name, &up.device_name, up.dev_eui);
    tags.insert("dr", up.tx_info.dr.to_string());
    tags.insert("frequency", up.tx_info.frequency.to_string());
    tags.merge_user_tags(&up.tags);

    let mut meta = Point::new("device_uplink", tags);
    meta.field("value", Value::Integer(1));
    meta.field("f_cnt", Value::Integer(up.f_cnt as i64));
    if let Some(best) = best_signal(&up.rx_info) {
        meta.field("rssi", Value::Integer(best.rssi as i64));
        meta.field("snr", Value::Float(best.lo_ra_snr));
    }
    points.push(meta);

    Ok(points)
}

pub fn status_points(status: &StatusEvent) -> Vec<Point> {
    let mut points = Vec::new();
    let mut tags = identity_tags(&status.application_name, &status.device_name, status.dev_eui);
    tags.merge_user_tags(&status.tags);

    if let Some(battery) = status.battery {
        let mut point = Point::new("device_status_battery", tags.clone());
        point.field("value", Value::Integer(battery as i64));
        points.push(point);
    }
    if !status.battery_level_unavailable {
        if let Some(level) = status.battery_level {
            let mut point = Point::new("device_status_battery_level", tags.clone());
            point.field("value", Value::Float(level));
            points.push(point);
        }
    }
    if let Some(margin) = status.margin {
        let mut point = Point::new("device_status_margin", tags.clone());
        point.field("value", Value::Integer(margin as i64));
        points.push(point);
    }

    points
}

pub fn join_points(join: &JoinEvent) -> Vec<Point> {
    let mut tags = identity_tags(&join.application_name, &join.device_name, join.dev_eui);
    tags.merge_user_tags(&join.tags);

    let mut point = Point::new("device_join", tags);
    point.field("value", Value::Integer(1));
    point.field("dev_addr", Value::String(join.dev_addr.to_string()));
    vec![point]
}

pub fn ack_points(ack: &AckEvent) -> Vec<Point> {
    let mut tags = identity_tags(&ack.application_name, &ack.device_name, ack.dev_eui);
    tags.merge_user_tags(&ack.tags);

    let mut point = Point::new("device_ack", tags);
    point.field("value", Value::Integer(1));
    point.field("acknowledged", Value::Bool(ack.acknowledged));
    vec![point]
}

pub fn error_points(error: &ErrorEvent) -> Vec<Point> {
    let mut tags = identity_tags(&error.application_name, &error.device_name, error.dev_eui);
    tags.insert("type", error.error_type.clone());
    tags.merge_user_tags(&error.tags);

    let mut point = Point::new("device_error", tags);
    point.field("value", Value::Integer(1));
    point.field("error", Value::String(error.error.clone()));
    vec![point]
}

// Maximum SNR wins; the first report keeps the slot on a tie.
fn best_signal(reports: &[RxInfo]) -> Option<&RxInfo> {
    reports.iter().reduce(|best, report| {
        if report.lo_ra_snr > best.lo_ra_snr {
            report
        } else {
            best
        }
    })
}

fn identity_tags(application_name: &str, device_name: &str, dev_eui: DevEui) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert("application_name", application_name);
    tags.insert("dev_eui", dev_eui.to_string());
    tags.insert("device_name", device_name);
    tags
}
