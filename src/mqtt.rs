use crate::config::Config;
use crate::events::Event as LoraEvent;
use crate::forward::ForwarderHandle;
use anyhow::Result;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::time::{sleep, Duration};

/// Listens on the network server's per-device event topics and feeds decoded
/// events into the forwarder channel. The outer loop reconnects forever.
pub async fn run_listener(config: Config, forwarder: ForwarderHandle) -> Result<()> {
    let event_filter = format!("{}/application/+/device/+/event/+", config.mqtt_topic_prefix);
    let stats = forwarder.stats();

    loop {
        let mut options = MqttOptions::new(
            config.mqtt_client_id.clone(),
            config.mqtt_host.clone(),
            config.mqtt_port,
        );
        options.set_keep_alive(config.mqtt_keepalive());
        if let Some(username) = &config.mqtt_username {
            options.set_credentials(
                username.clone(),
                config.mqtt_password.clone().unwrap_or_default(),
            );
        }

        let (client, mut eventloop) = AsyncClient::new(options, 32);

        match client.subscribe(event_filter.clone(), QoS::AtLeastOnce).await {
            Ok(_) => {
                tracing::info!(topic=%event_filter, "subscribed to event feed");
                stats.set_mqtt_connected(true);
            }
            Err(err) => {
                tracing::warn!(error=%err, "failed to subscribe to event feed; retrying");
                sleep(Duration::from_secs(2)).await;
                continue;
            }
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    let Some(kind) = event_kind_from_topic(&config.mqtt_topic_prefix, &publish.topic)
                    else {
                        continue;
                    };
                    match LoraEvent::decode(kind, &publish.payload) {
                        Ok(Some(event)) => {
                            if let Err(err) = forwarder.enqueue(event).await {
                                tracing::warn!(error=%err, "failed to enqueue event");
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(error=%err, topic=%publish.topic, "failed to decode event payload")
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    stats.set_mqtt_connected(false);
                    tracing::warn!(error=%err, "MQTT connection dropped; reconnecting");
                    break;
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }
}

// <prefix>/application/<id>/device/<devEUI>/event/<kind>
fn event_kind_from_topic<'a>(prefix: &str, topic: &'a str) -> Option<&'a str> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() != 7
        || parts[0] != prefix
        || parts[1] != "application"
        || parts[3] != "device"
        || parts[5] != "event"
    {
        return None;
    }
    Some(parts[6])
}
