//! # commander-adapter-mqtt
//!
//! MQTT adapter — connects commander to the message bus.
//!
//! ## Responsibilities
//! - Parse the text of bus constraints (`topic[.json.path] [op value]`) and
//!   bus actions (`topic[.json.path] [=] value`) into rule payloads
//! - Subscribe constraint topics on deploy and again on every reconnection
//! - Match inbound messages against constraints and write their state into
//!   the engine
//! - Publish action payloads, rendering `minijinja` templates against the
//!   automation snapshot
//!
//! ## Dependency rule
//! Same as other adapters: depends on `commander-app` and `commander-domain`.
//! The broker is reached through the [`Broker`] trait so everything but the
//! rumqttc event loop runs without a live broker.

pub mod action;
pub mod broker;
pub mod config;
pub mod deployer;
pub mod error;
pub mod message;
pub mod parse;
mod template;

pub use action::MqttActionHandler;
pub use broker::{Broker, MqttBroker};
pub use config::MqttConfig;
pub use deployer::MqttDeployer;
pub use error::MqttError;
