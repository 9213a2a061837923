//! Public entry point.
//!
//! A [`Client`] is bound to one base URL and one driver. Every call computes
//! its own target URL from the base and an optional sub-route, so a client can
//! be reused for any number of routes.
//!
//! ```no_run
//! use gosub_net::{Client, Params, Settings};
//!
//! # fn main() -> Result<(), gosub_net::NetError> {
//! let mut client = Client::new("https://httpbin.org/", Settings::new())?;
//! let resp = client.get(Some("get"), &Params::from([("q", "gosub")]))?;
//! println!("{} {}", resp.code(), resp.body_or(""));
//! # Ok(()) }
//! ```
use std::sync::Arc;

use http::Method;
use url::Url;

use crate::config::Settings;
use crate::errors::{NetError, Result};
use crate::net::driver::{Driver, DriverRegistry};
use crate::net::request::Params;
use crate::net::response::Response;

pub struct Client {
    /// Base URL without trailing slashes
    url: String,
    /// Defaults merged with the caller's settings
    settings: Arc<Settings>,
    driver: Box<dyn Driver>,
}

impl Client {
    /// Creates a client using the drivers of [`DriverRegistry::default()`].
    pub fn new(url: &str, settings: Settings) -> Result<Self> {
        Self::with_registry(url, settings, &DriverRegistry::default())
    }

    /// Creates a client, resolving the `driver` setting in `registry`.
    pub fn with_registry(url: &str, settings: Settings, registry: &DriverRegistry) -> Result<Self> {
        let url = validate_url(url)?;

        let settings = Arc::new(Settings::merged(settings));
        let driver = registry.create(settings.driver_name()?, settings.clone())?;

        Ok(Self {
            url: strip_trailing_slashes(url.as_str()).to_string(),
            settings,
            driver,
        })
    }

    pub fn get(&mut self, sub_route: Option<&str>, params: &Params) -> Result<Response> {
        self.send(Method::GET, sub_route, params)
    }

    pub fn post(&mut self, sub_route: Option<&str>, params: &Params) -> Result<Response> {
        self.send(Method::POST, sub_route, params)
    }

    pub fn put(&mut self, sub_route: Option<&str>, params: &Params) -> Result<Response> {
        self.send(Method::PUT, sub_route, params)
    }

    pub fn delete(&mut self, sub_route: Option<&str>, params: &Params) -> Result<Response> {
        self.send(Method::DELETE, sub_route, params)
    }

    /// Sends `method` to the base URL, or to `base/sub_route` when a non-empty
    /// sub-route is given.
    pub fn send(&mut self, method: Method, sub_route: Option<&str>, params: &Params) -> Result<Response> {
        let target = self.target_url(sub_route);
        self.driver.prepare_request(&target, &method, params)?;
        self.driver.send()
    }

    /// URL a request for `sub_route` goes to.
    pub fn target_url(&self, sub_route: Option<&str>) -> String {
        match sub_route.map(|s| s.trim_start_matches('/')) {
            Some(route) if !route.is_empty() => format!("{}/{}", self.url, route),
            _ => self.url.clone(),
        }
    }

    /// Base URL in normalized form (percent-encoded, lowercase scheme and
    /// host), without trailing slashes.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }
}

/// Accepts absolute URLs that have both a scheme and a host and returns them
/// normalized, so the transport is never handed something it would reject.
fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| NetError::InvalidConfiguration(format!("invalid URL '{url}': {e}")))?;
    if !parsed.has_host() || parsed.host_str().is_some_and(str::is_empty) {
        return Err(NetError::InvalidConfiguration(format!("URL '{url}' has no host")));
    }
    Ok(parsed)
}

fn strip_trailing_slashes(url: &str) -> &str {
    url.trim_end_matches('/')
}
