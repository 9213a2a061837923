//! HTTP client: settings flow into a driver, the driver performs the request
//! and its raw output is parsed into a [`Response`].

pub mod client;
pub mod driver;
pub mod drivers;
pub mod headers;
pub mod request;
pub mod response;

pub use client::Client;
pub use driver::{Driver, DriverFactory, DriverRegistry, MAX_REDIRECTS};
pub use headers::{HeaderValue, Headers};
pub use request::{Params, ALLOWED_METHODS};
pub use response::{Response, TransferInfo};
