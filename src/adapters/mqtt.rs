//! Direct MQTT transport.
//!
//! Implements [`Transport`] on top of the ESP-IDF MQTT client.  Inbound
//! events arrive on the client's connection thread and are handed to the
//! poll loop through a channel, one message per `poll_inbound`.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client`.
//! - **all other targets**: only the URL helper; use
//!   [`SimBroker`](super::sim::SimBroker) or the relay transport instead.

use crate::protocol::envelope::MAX_PAYLOAD_SIZE;

/// Port on which the broker speaks MQTT over TLS.
const TLS_PORT: u16 = 8883;

/// `mqtts://host:port` for the TLS port, `mqtt://host:port` otherwise.
pub fn broker_url(host: &str, port: u16) -> String {
    let scheme = if port == TLS_PORT { "mqtts" } else { "mqtt" };
    format!("{scheme}://{host}:{port}")
}

/// Inbound payloads above the envelope limit are dropped at the edge.
pub fn accept_payload(len: usize) -> bool {
    len <= MAX_PAYLOAD_SIZE
}

#[cfg(target_os = "espidf")]
pub use esp::EspMqttTransport;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{Receiver, TryRecvError, sync_channel};
    use std::thread;

    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::{info, warn};

    use super::{accept_payload, broker_url};
    use crate::app::ports::{InboundMessage, Transport};
    use crate::config::IotConfig;
    use crate::error::TransportError;

    /// Inbound messages buffered between the receiver thread and the poll loop.
    const INBOX_DEPTH: usize = 8;

    pub struct EspMqttTransport {
        client: EspMqttClient<'static>,
        inbox: Receiver<InboundMessage>,
        connected: Arc<AtomicBool>,
    }

    impl EspMqttTransport {
        /// Connect to the configured broker using `client_id`.
        pub fn connect(config: &IotConfig, client_id: &str) -> anyhow::Result<Self> {
            let url = broker_url(&config.host, config.port);
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            };
            let (client, mut conn) = EspMqttClient::new(&url, &conf)?;
            info!("MQTT: connecting to {} as {}", url, client_id);

            let connected = Arc::new(AtomicBool::new(false));
            let flag = connected.clone();
            let (tx, inbox) = sync_channel(INBOX_DEPTH);

            thread::Builder::new()
                .name("mqtt-rx".into())
                .stack_size(8 * 1024)
                .spawn(move || {
                    while let Ok(event) = conn.next() {
                        match event.payload() {
                            EventPayload::Connected(_) => flag.store(true, Ordering::Relaxed),
                            EventPayload::Disconnected => {
                                flag.store(false, Ordering::Relaxed);
                                warn!("MQTT: disconnected");
                            }
                            EventPayload::Received {
                                topic: Some(topic),
                                data,
                                details: Details::Complete,
                                ..
                            } => {
                                if !accept_payload(data.len()) {
                                    warn!("MQTT: dropping {} byte payload on {}", data.len(), topic);
                                    continue;
                                }
                                let msg = InboundMessage {
                                    topic: topic.into(),
                                    payload: data.to_vec(),
                                };
                                if tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    info!("MQTT: receiver exiting");
                })?;

            Ok(Self {
                client,
                inbox,
                connected,
            })
        }

        pub fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }
    }

    impl Transport for EspMqttTransport {
        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
            self.client
                .publish(topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: publish to {} failed: {:?}", topic, e);
                    TransportError::PublishFailed
                })
        }

        fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
            self.client
                .subscribe(filter, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: subscribe to {} failed: {:?}", filter, e);
                    TransportError::SubscribeFailed
                })
        }

        fn poll_inbound(&mut self) -> Result<Option<InboundMessage>, TransportError> {
            match self.inbox.try_recv() {
                Ok(msg) => Ok(Some(msg)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(TransportError::NotConnected),
            }
        }
    }
}
