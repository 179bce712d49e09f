mod bus;
mod cayenne;
mod config;
mod events;
mod forward;
mod http;
mod influx;
mod lineproto;
mod mqtt;

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,lora_event_forwarder=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let stats = Arc::new(forward::ForwarderStats::new());
    let (tx, rx) = mpsc::channel::<events::Event>(config.max_queue);
    let forwarder = forward::ForwarderHandle::new(tx, stats.clone());

    let influx = if config.influx_enabled {
        tracing::info!(endpoint=%config.influx_endpoint, db=%config.influx_db, "influxdb sink enabled");
        Some(influx::InfluxSink::new(config.influx()))
    } else {
        None
    };

    let (bus, bus_poller) = if config.publish_enabled {
        tracing::info!(prefix=%config.publish_topic_prefix, "event bus sink enabled");
        let (publisher, poller) = bus::BusPublisher::connect(&config);
        (Some(publisher), Some(poller))
    } else {
        (None, None)
    };

    if influx.is_none() && bus.is_none() {
        tracing::warn!("no sinks enabled; events will be consumed and dropped");
    }

    let _worker = forward::spawn_worker(rx, stats.clone(), influx, bus, config.cayenne_lpp_port);

    let mqtt_config = config.clone();
    let mqtt_forwarder = forwarder.clone();
    let mqtt_handle = tokio::spawn(async move {
        if let Err(err) = mqtt::run_listener(mqtt_config, mqtt_forwarder).await {
            tracing::error!(error=%err, "event listener exited");
        }
    });

    let app = http::router(http::HttpState {
        stats: stats.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    tracing::info!(bind=%config.http_bind, "forwarder HTTP listening");
    let http_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = mqtt_handle => {}
        _ = http_handle => {}
        _ = async {
            if let Some(handle) = bus_poller {
                let _ = handle.await;
            } else {
                futures::future::pending::<()>().await;
            }
        } => {}
    }

    Ok(())
}
