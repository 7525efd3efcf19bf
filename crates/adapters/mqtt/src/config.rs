//! MQTT connection configuration.

use std::time::Duration;

use rumqttc::{MqttOptions, QoS};
use serde::Deserialize;

use crate::error::MqttError;

const DEFAULT_PORT: u16 = 1883;
const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Configuration of the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker address as `tcp://host:port`. Takes precedence over
    /// `host`/`port` when set.
    pub uri: Option<String>,
    /// Broker hostname or IP address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// QoS used for subscriptions and publications (0, 1 or 2).
    pub qos: u8,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            client_id: "commander".to_string(),
            qos: 2,
            keep_alive_secs: 5,
            username: None,
            password: None,
        }
    }
}

impl MqttConfig {
    /// The `(host, port)` pair to connect to.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidUri`] if `uri` is set but is not a
    /// `tcp://` or `mqtt://` address with a valid port.
    pub fn endpoint(&self) -> Result<(String, u16), MqttError> {
        let Some(uri) = &self.uri else {
            return Ok((self.host.clone(), self.port));
        };
        let invalid = || MqttError::InvalidUri(uri.clone());
        let address = uri
            .strip_prefix("tcp://")
            .or_else(|| uri.strip_prefix("mqtt://"))
            .ok_or_else(invalid)?
            .trim_end_matches('/');
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port.parse().map_err(|_| invalid())?;
                Ok((host.to_string(), port))
            }
            None if !address.is_empty() => Ok((address.to_string(), DEFAULT_PORT)),
            _ => Err(invalid()),
        }
    }

    /// # Errors
    ///
    /// Returns [`MqttError::InvalidQos`] if `qos` is not 0, 1 or 2.
    pub fn qos(&self) -> Result<QoS, MqttError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MqttError::InvalidQos(other)),
        }
    }

    /// Build the rumqttc options for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidUri`] if the broker address is invalid.
    pub fn options(&self) -> Result<MqttOptions, MqttError> {
        let (host, port) = self.endpoint()?;
        let mut options = MqttOptions::new(&self.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS)));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            options.set_credentials(username, password);
        }
        Ok(options)
    }
}
