//! Small synchronous HTTP client with pluggable transport drivers.
//!
//! ```no_run
//! use gosub_net::{Client, Params, Settings};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), gosub_net::NetError> {
//! let settings = Settings::builder()
//!     .timeout(Duration::from_secs(5))
//!     .header("Accept", "application/json")
//!     .build();
//!
//! let mut client = Client::new("https://example.com/api", settings)?;
//! let resp = client.post(Some("login"), &Params::from([("user", "gosub")]))?;
//! assert_eq!(resp.code(), 200);
//! # Ok(()) }
//! ```
pub mod config;
pub mod errors;
pub mod net;

pub use config::{Settings, SettingsBuilder};
pub use errors::NetError;
pub use http::Method;
pub use net::*;
