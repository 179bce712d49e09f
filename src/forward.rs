use crate::bus::BusPublisher;
use crate::events::Event;
use crate::influx::{encode_event, InfluxSink};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct ForwarderHandle {
    tx: mpsc::Sender<Event>,
    stats: Arc<ForwarderStats>,
}

impl ForwarderHandle {
    pub fn new(tx: mpsc::Sender<Event>, stats: Arc<ForwarderStats>) -> Self {
        Self { tx, stats }
    }

    pub fn stats(&self) -> Arc<ForwarderStats> {
        self.stats.clone()
    }

    pub async fn enqueue(&self, event: Event) -> Result<()> {
        self.stats.events_received.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(kind = event.kind(), dev_eui = %event.dev_eui(), "queued event");
        self.tx.send(event).await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ForwarderStats {
    pub events_received: AtomicU64,
    pub events_forwarded: AtomicU64,
    pub delivery_errors: AtomicU64,
    pub encode_errors: AtomicU64,
    pub last_event_unix_ms: AtomicU64,
    pub mqtt_connected: AtomicBool,
    pub last_error: Mutex<Option<String>>,
}

impl ForwarderStats {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_forwarded: AtomicU64::new(0),
            delivery_errors: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            last_event_unix_ms: AtomicU64::new(0),
            mqtt_connected: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn set_mqtt_connected(&self, connected: bool) {
        self.mqtt_connected.store(connected, Ordering::Relaxed);
    }

    pub fn record_error(&self, err: impl Into<String>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(err.into());
        }
    }

    pub fn clear_error(&self) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }
}

/// Drains the event channel and hands each event to the enabled sinks. An
/// encode failure means the payload shape is wrong and is never retried; a
/// delivery failure is logged and counted, and the QoS 1 source re-delivers.
pub fn spawn_worker(
    mut rx: mpsc::Receiver<Event>,
    stats: Arc<ForwarderStats>,
    influx: Option<InfluxSink>,
    bus: Option<BusPublisher>,
    lpp_port: Option<u8>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            stats
                .last_event_unix_ms
                .store(Utc::now().timestamp_millis() as u64, Ordering::Relaxed);
            let mut delivered = true;

            if let Some(influx) = &influx {
                match encode_event(&event, lpp_port) {
                    Ok(Some(body)) => {
                        if let Err(err) = influx.write_body(body).await {
                            delivered = false;
                            stats.delivery_errors.fetch_add(1, Ordering::Relaxed);
                            stats.record_error(err.to_string());
                            tracing::warn!(
                                error=%err,
                                kind = event.kind(),
                                dev_eui = %event.dev_eui(),
                                "influxdb forward failed"
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        delivered = false;
                        stats.encode_errors.fetch_add(1, Ordering::Relaxed);
                        stats.record_error(err.to_string());
                        tracing::error!(
                            error=%err,
                            kind = event.kind(),
                            dev_eui = %event.dev_eui(),
                            "event payload could not be encoded"
                        );
                    }
                }
            }

            if let Some(bus) = &bus {
                if let Err(err) = bus.publish(&event).await {
                    delivered = false;
                    stats.delivery_errors.fetch_add(1, Ordering::Relaxed);
                    stats.record_error(err.to_string());
                    tracing::warn!(
                        error=%err,
                        kind = event.kind(),
                        dev_eui = %event.dev_eui(),
                        "event bus publish failed"
                    );
                }
            }

            if delivered {
                stats.events_forwarded.fetch_add(1, Ordering::Relaxed);
                stats.clear_error();
            }
        }
    })
}
