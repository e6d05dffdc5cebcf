// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! MQTT subscriber feeding the ingestor

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::Ingestor;
use crate::config::MqttConfig;

/// Wildcard subscription over the sensor namespace
///
/// The event loop is the single sequential consumer: each publish is handled
/// to completion before the next one is polled.
pub struct MqttSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
}

impl MqttSubscriber {
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);

        Self {
            client,
            eventloop,
            config: config.clone(),
        }
    }

    /// Poll until shutdown, dispatching every publish to `ingestor`
    pub async fn run(mut self, ingestor: Arc<Ingestor>, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let topic = self.config.subscription();
        let reconnect_delay = Duration::from_millis(self.config.reconnect_delay_ms);
        info!(
            "MQTT subscriber for {}:{} on '{}'",
            self.config.broker, self.config.port, topic
        );

        loop {
            tokio::select! {
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                        // Subscription does not survive a clean-session reconnect
                        subscribe(&self.client, &topic).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        debug!("MQTT received: {:?}", msg.topic);
                        ingestor.handle(&msg.topic, &msg.payload);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(reconnect_delay).await;
                    }
                },
                _ = shutdown.recv() => {
                    info!("MQTT subscriber shutting down...");
                    break;
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            debug!("MQTT disconnect: {}", e);
        }
        Ok(())
    }
}

/// Subscribe once; a failure is retried on the next ConnAck
async fn subscribe(client: &AsyncClient, topic: &str) -> bool {
    match client.subscribe(topic, QoS::AtLeastOnce).await {
        Ok(()) => {
            info!("Subscribed to MQTT topic: {}", topic);
            true
        }
        Err(e) => {
            warn!("MQTT subscribe failed, retrying on next connect: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_subscribe_is_not_fatal() {
        let MqttSubscriber { client, eventloop, config } = MqttSubscriber::new(&MqttConfig::default());
        // No event loop left to accept the request
        drop(eventloop);

        assert!(!subscribe(&client, &config.subscription()).await);
    }
}
