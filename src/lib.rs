//! Bin-limiter - keeps the recycle bin under a size limit
//!
//! A poll loop checks the size of the bin once per second and empties it as
//! soon as it reaches the configured limit.

pub mod config;
pub mod context;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod presence;
pub mod tui;

pub use config::{Configuration, POLL_INTERVAL};
pub use context::{AppContext, Shutdown};
pub use error::{GatewayError, Result, StartError, ValidationError};
pub use monitor::{MonitorEvent, MonitoringController, MonitoringState};
pub use platform::{bytes_to_gb, BinGateway};
pub use presence::{MenuEvent, PresenceState, StatusPresence, WindowHandle};
