//! MQTT observer feed.
//!
//! Connects to the broker, subscribes to the configured topic and hands each
//! publish to [`Bridge::handle_payload`], awaiting it before polling the next
//! event. A slow upload therefore delays everything behind it; there is no
//! internal queue.
//!
//! Any connection failure, refused CONNACK or broker disconnect ends
//! [`run`] with a [`TransportError`]. Reconnecting is left to whatever
//! supervises the process.

use std::time::{Duration, Instant};

use log::{debug, error, info};
use rumqttc::{
    AsyncClient, ConnectionError, Event, MqttOptions, Packet, QoS, StateError, Transport,
};

use crate::bridge::Bridge;
use crate::config::MqttConfig;
use crate::error::{ConfigError, TransportError};
use crate::metrics;
use crate::service::Uploader;

/// Largest publish accepted from the broker.
const MAX_INCOMING_PACKET: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl TransportKind {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => Ok(TransportKind::Tcp),
            "tls" | "mqtts" => Ok(TransportKind::Tls),
            "ws" | "websocket" | "websockets" => Ok(TransportKind::Ws),
            "wss" => Ok(TransportKind::Wss),
            _ => Err(ConfigError::MqttTransport(s.to_string())),
        }
    }

    fn is_websocket(self) -> bool {
        matches!(self, TransportKind::Ws | TransportKind::Wss)
    }
}

/// Broker address as rumqttc expects it: a full URL for websockets, a bare
/// host otherwise.
pub fn broker_address(config: &MqttConfig, kind: TransportKind) -> String {
    let path = if config.ws_path.starts_with('/') {
        config.ws_path.clone()
    } else {
        format!("/{}", config.ws_path)
    };
    match kind {
        TransportKind::Ws => format!("ws://{}:{}{}", config.host, config.port, path),
        TransportKind::Wss => format!("wss://{}:{}{}", config.host, config.port, path),
        TransportKind::Tcp | TransportKind::Tls => config.host.clone(),
    }
}

/// Build client options from config.
pub fn mqtt_options(config: &MqttConfig) -> Result<MqttOptions, ConfigError> {
    let kind = TransportKind::parse(&config.transport)?;
    let mut options = MqttOptions::new(&config.client_id, broker_address(config, kind), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.max(5)));
    options.set_max_packet_size(MAX_INCOMING_PACKET, MAX_INCOMING_PACKET);
    if !config.username.is_empty() {
        options.set_credentials(&config.username, &config.password);
    }
    match kind {
        TransportKind::Tcp => {}
        TransportKind::Tls => {
            options.set_transport(Transport::tls_with_default_config());
        }
        TransportKind::Ws => {
            options.set_transport(Transport::Ws);
        }
        TransportKind::Wss => {
            options.set_transport(Transport::wss_with_default_config());
        }
    }
    debug!(
        "MQTT options: client_id={} websocket={}",
        config.client_id,
        kind.is_websocket()
    );
    Ok(options)
}

/// Map a failed poll onto the bridge's view of the feed.
///
/// The v4 client reports a refused CONNACK as a connection error, and a
/// broker-sent DISCONNECT as an unexpected incoming packet.
fn classify(error: ConnectionError) -> TransportError {
    match error {
        ConnectionError::ConnectionRefused(code) => TransportError::Refused(code),
        ConnectionError::MqttState(StateError::WrongPacket) => TransportError::Disconnected,
        other => TransportError::Connection(other),
    }
}

/// Consume the observer feed until the connection ends.
///
/// Only returns on failure; the error is always fatal to the bridge.
pub async fn run<U: Uploader>(
    options: MqttOptions,
    topic: &str,
    bridge: &mut Bridge<U>,
    stats_interval: Option<Duration>,
) -> TransportError {
    let (client, mut eventloop) = AsyncClient::new(options, 10);
    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce).await {
        return TransportError::Client(e);
    }

    let mut last_stats = Instant::now();
    loop {
        let event = match eventloop.poll().await {
            Ok(event) => event,
            Err(e) => {
                let fatal = classify(e);
                error!("MQTT connection failed: {}", fatal);
                return fatal;
            }
        };

        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                info!("Connected to MQTT broker, subscribing to {}", topic);
            }
            Event::Incoming(Packet::SubAck(_)) => {
                debug!("Subscription to {} acknowledged", topic);
            }
            Event::Incoming(Packet::Publish(publish)) => {
                bridge.handle_payload(&publish.payload).await;
            }
            _ => {}
        }

        if let Some(interval) = stats_interval {
            if last_stats.elapsed() >= interval {
                info!("Stats: {}", metrics::snapshot());
                last_stats = Instant::now();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rumqttc::ConnectReturnCode;

    #[test]
    fn poll_errors_are_classified() {
        assert!(matches!(
            classify(ConnectionError::ConnectionRefused(ConnectReturnCode::NotAuthorized)),
            TransportError::Refused(ConnectReturnCode::NotAuthorized)
        ));
        assert!(matches!(
            classify(ConnectionError::MqttState(StateError::WrongPacket)),
            TransportError::Disconnected
        ));
        assert!(matches!(
            classify(ConnectionError::NetworkTimeout),
            TransportError::Connection(ConnectionError::NetworkTimeout)
        ));
    }

    #[test]
    fn parses_transport_names() {
        assert_eq!(TransportKind::parse("WSS").unwrap(), TransportKind::Wss);
        assert_eq!(TransportKind::parse("tcp").unwrap(), TransportKind::Tcp);
        assert_eq!(TransportKind::parse("mqtts").unwrap(), TransportKind::Tls);
        assert!(TransportKind::parse("quic").is_err());
    }

    #[test]
    fn websocket_address_is_a_url() {
        let mut mqtt = Config::default().mqtt;
        mqtt.host = "broker.example".into();
        mqtt.port = 443;
        mqtt.ws_path = "mqtt".into();
        assert_eq!(
            broker_address(&mqtt, TransportKind::Wss),
            "wss://broker.example:443/mqtt"
        );
        assert_eq!(broker_address(&mqtt, TransportKind::Tcp), "broker.example");
    }

    #[test]
    fn options_reject_unknown_transport() {
        let mut mqtt = Config::default().mqtt;
        mqtt.transport = "carrier-pigeon".into();
        assert!(matches!(
            mqtt_options(&mqtt),
            Err(ConfigError::MqttTransport(_))
        ));
        mqtt.transport = "tcp".into();
        let options = mqtt_options(&mqtt).unwrap();
        assert_eq!(options.client_id(), "wardrive_bot");
    }
}
