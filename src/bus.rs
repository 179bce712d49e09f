use crate::config::Config;
use crate::events::Event;
use anyhow::Result;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// JSON event re-publisher. Routing attributes travel in the topic path:
/// `<prefix>/<devEUI>/event/<kind>`. This path never touches the
/// line-protocol encoder.
pub struct BusPublisher {
    client: AsyncClient,
    topic_prefix: String,
}

impl BusPublisher {
    pub fn connect(config: &Config) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(
            config.publish_client_id.clone(),
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

        let (client, mut eventloop) = AsyncClient::new(options, 256);
        let poller = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    tracing::warn!(error=%err, "event bus connection error; retrying");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        });

        (
            Self {
                client,
                topic_prefix: config.publish_topic_prefix.clone(),
            },
            poller,
        )
    }

    pub async fn publish(&self, event: &Event) -> Result<()> {
        let topic = event_topic(&self.topic_prefix, event);
        let payload = match event {
            Event::Up(inner) => serde_json::to_vec(inner)?,
            Event::Join(inner) => serde_json::to_vec(inner)?,
            Event::Ack(inner) => serde_json::to_vec(inner)?,
            Event::Error(inner) => serde_json::to_vec(inner)?,
            Event::Status(inner) => serde_json::to_vec(inner)?,
            Event::Location(inner) => serde_json::to_vec(inner)?,
        };
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}

fn event_topic(prefix: &str, event: &Event) -> String {
    format!("{}/{}/event/{}", prefix, event.dev_eui(), event.kind())
}
