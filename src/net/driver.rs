//! Transport drivers.
//!
//! A [`Driver`] performs the actual network I/O for a client. The client
//! calls [`prepare_request`](Driver::prepare_request) and then
//! [`send`](Driver::send) for every request; the driver owns the transport
//! handle in between and releases it when `send` returns, whatever the outcome.
//!
//! Drivers are looked up by name in a [`DriverRegistry`]. The default registry
//! contains the drivers enabled at compile time:
//!
//! | name        | feature          | transport                |
//! |-------------|------------------|--------------------------|
//! | `"curl"`    | `driver_curl`    | libcurl (`curl` crate)   |
//! | `"reqwest"` | `driver_reqwest` | `reqwest::blocking`      |
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::config::Settings;
use crate::errors::{NetError, Result};
use crate::net::request::{is_allowed, Params};
use crate::net::response::Response;

/// Maximum number of redirects a driver follows when `allow_redirects` is on.
pub const MAX_REDIRECTS: u32 = 16;

/// A pluggable HTTP transport.
pub trait Driver: Send {
    /// Returns a type-erased reference to the driver.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference to the driver.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Name the driver is registered under.
    fn name(&self) -> &'static str;

    /// Version of the underlying transport.
    fn version(&self) -> String;

    /// Whether the transport can run on this system. Must not have side effects.
    fn is_supported(&self) -> bool;

    /// Whether `method` is one the driver accepts.
    fn is_method_supported(&self, method: &Method) -> bool {
        is_allowed(method)
    }

    /// Configures the transport for one request, replacing any request that
    /// was prepared before but never sent.
    ///
    /// Fails with [`NetError::UnsupportedMethod`] before anything is allocated
    /// when `method` is not accepted.
    fn prepare_request(&mut self, url: &str, method: &Method, params: &Params) -> Result<()>;

    /// Executes the prepared request and releases the transport handle.
    ///
    /// Network, DNS, TLS and timeout failures are returned as [`NetError::Transport`].
    fn send(&mut self) -> Result<Response>;

    /// Type-erased access to the transport handle of the prepared request.
    /// `None` when nothing is prepared.
    fn driver_raw(&self) -> Option<&dyn Any>;

    /// Mutable variant of [`driver_raw`](Self::driver_raw).
    fn driver_raw_mut(&mut self) -> Option<&mut dyn Any>;
}

/// Creates a driver bound to the client settings.
pub type DriverFactory = fn(Arc<Settings>) -> Box<dyn Driver>;

/// Name to factory lookup for drivers.
#[derive(Clone)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Creates a registry without any driver.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `name` (case-insensitive), replacing any
    /// driver registered under the same name.
    pub fn register(&mut self, name: &str, factory: DriverFactory) -> &mut Self {
        self.factories.insert(name.to_ascii_lowercase(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the driver registered under `name` and checks that it can run.
    ///
    /// Fails with [`NetError::UnsupportedDriver`] for unknown names and with
    /// [`NetError::DriverUnavailable`] when the driver reports itself unsupported.
    pub fn create(&self, name: &str, settings: Arc<Settings>) -> Result<Box<dyn Driver>> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| NetError::UnsupportedDriver(name.to_string()))?;

        let driver = factory(settings);
        if !driver.is_supported() {
            return Err(NetError::DriverUnavailable(name.to_string()));
        }

        log::debug!("using driver '{}' ({})", driver.name(), driver.version());
        Ok(driver)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "driver_curl")]
        registry.register(crate::net::drivers::curl::NAME, |settings| {
            Box::new(crate::net::drivers::curl::CurlDriver::new(settings))
        });

        #[cfg(feature = "driver_reqwest")]
        registry.register(crate::net::drivers::reqwest::NAME, |settings| {
            Box::new(crate::net::drivers::reqwest::ReqwestDriver::new(settings))
        });

        registry
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry").field("drivers", &self.names()).finish()
    }
}
