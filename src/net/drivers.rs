//! Built-in [`Driver`](crate::net::driver::Driver) implementations.

#[cfg(feature = "driver_curl")]
pub mod curl;

#[cfg(feature = "driver_reqwest")]
pub mod reqwest;
