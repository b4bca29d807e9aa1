//! # VoIP.ms SMS
//!
//! Bridge between the VoIP.ms SMS/MMS REST API and an entity/event model.
//!
//! ## Features
//!
//! - **Outbound**: send SMS (and MMS with one image) from a configured DID
//! - **Inbound**: per-DID webhook endpoints with unguessable, secret-salted ids
//! - **Routing**: inbound messages reach the sensor whose DID matches the destination,
//!   tolerating a missing or extra North American country code
//! - **Observable state**: every DID has a sensor publishing its last message
//! - **Configuration**: layered files plus `VOIPMS_SMS__*` environment variables
//! - **Observability**: structured logging through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voipms_sms::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     config.validate()?;
//!
//!     let bridge = Arc::new(Bridge::from_config(&config)?);
//!     for did in &config.account.dids {
//!         println!("{} -> {:?}", did, bridge.webhook_url(did));
//!     }
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8123").await?;
//!     axum::serve(listener, voipms_sms::server::router(bridge)).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod notifications;
pub mod sensor;
pub mod server;
pub mod telemetry;

pub use crate::config::*;

/// Common imports for VoIP.ms SMS usage
pub mod prelude {
    pub use crate::bridge::{Bridge, BridgeError};
    pub use crate::config::{AccountConfig, AppConfig, LoggingConfig, ServerConfig};
    pub use crate::notifications::PersistentNotifications;
    pub use crate::sensor::{IncomingSmsSensor, SensorState};
    pub use sms_core::*;
}
