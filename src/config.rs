//! Client settings.
//!
//! [`Settings`] is an ordered key/value store of JSON values. A client merges
//! the settings it is given over [`Settings::defaults()`] once, at construction,
//! and shares the result with its driver. Keys that no driver recognizes are
//! kept and serialized along with the rest.
//!
//! # Recognized keys
//! - `driver`: name of the transport driver (default: `"curl"`).
//! - `timeout`: per-request timeout in seconds (default: `10`). Zero disables it.
//! - `allow_redirects`: follow up to 16 redirects (default: `true`).
//! - `user_agent`: `User-Agent` to send (default: [`DEFAULT_USER_AGENT`]).
//! - `headers`: outgoing headers, either an object (`{"Accept": "text/html"}`)
//!   or an array of raw header lines (`["Accept: text/html"]`).
//! - `forbid_cache`: always open a fresh connection and never reuse it.
//!
//! # Examples
//! ```rust
//! use gosub_net::config::Settings;
//! use std::time::Duration;
//!
//! let overrides = Settings::builder()
//!     .timeout(Duration::from_secs(3))
//!     .header("Accept", "application/json")
//!     .build();
//!
//! let settings = Settings::merged(overrides);
//! assert_eq!(settings.driver_name().ok(), Some("curl"));
//! assert_eq!(settings.timeout(), Some(Duration::from_secs(3)));
//! ```
use std::fmt;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{NetError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_DRIVER: &str = "curl";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DRIVER: &str = "driver";
pub const TIMEOUT: &str = "timeout";
pub const ALLOW_REDIRECTS: &str = "allow_redirects";
pub const USER_AGENT: &str = "user_agent";
pub const HEADERS: &str = "headers";
pub const FORBID_CACHE: &str = "forbid_cache";

lazy_static! {
    /// User agent sent when the settings do not name one.
    pub static ref DEFAULT_USER_AGENT: String =
        format!("GosubNet/{} ({}; {})", VERSION, std::env::consts::OS, std::env::consts::ARCH);
}

/// Ordered key/value settings store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    items: Map<String, Value>,
}

impl Settings {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the documented defaults for every recognized key except `forbid_cache`.
    pub fn defaults() -> Self {
        let mut settings = Self::new();
        settings.put(DRIVER, DEFAULT_DRIVER);
        settings.put(TIMEOUT, DEFAULT_TIMEOUT_SECS);
        settings.put(ALLOW_REDIRECTS, true);
        settings.put(USER_AGENT, DEFAULT_USER_AGENT.as_str());
        settings.put(HEADERS, Value::Object(Map::new()));
        settings
    }

    /// Returns the defaults with every key of `overrides` replacing the default
    /// value. Values are replaced as a whole; `headers` is not merged.
    pub fn merged(overrides: Settings) -> Self {
        let mut settings = Self::defaults();
        for (key, value) in overrides.items {
            settings.items.insert(key, value);
        }
        settings
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.items.get(key).unwrap_or(default)
    }

    /// Sets `key`, overwriting any previous value in place.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.items.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.items.iter()
    }

    /// Returns a plain copy of the entries.
    pub fn to_map(&self) -> Map<String, Value> {
        self.items.clone()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.items).unwrap_or_else(|_| "{}".to_string())
    }

    // ---------- Typed accessors ----------

    /// Driver to use, [`DEFAULT_DRIVER`] when the key is absent.
    ///
    /// A `driver` value that is not a string names no driver and fails with
    /// [`NetError::UnsupportedDriver`].
    pub fn driver_name(&self) -> Result<&str> {
        match self.get(DRIVER) {
            None => Ok(DEFAULT_DRIVER),
            Some(Value::String(name)) => Ok(name),
            Some(other) => Err(NetError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Per-request timeout. `None` when unset, zero, negative or not a number.
    pub fn timeout(&self) -> Option<Duration> {
        self.get(TIMEOUT)
            .and_then(Value::as_f64)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn allow_redirects(&self) -> bool {
        self.get(ALLOW_REDIRECTS).is_some_and(truthy)
    }

    /// User agent to send. `None` when unset or empty.
    pub fn user_agent(&self) -> Option<&str> {
        self.get(USER_AGENT).and_then(Value::as_str).filter(|ua| !ua.is_empty())
    }

    pub fn headers(&self) -> Option<&Value> {
        self.get(HEADERS)
    }

    pub fn forbid_cache(&self) -> bool {
        self.get(FORBID_CACHE).is_some_and(truthy)
    }
}

/// Loose truthiness used for flag settings: `0`, `""`, `"0"`, `false`, `null`
/// and empty containers are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(items: Map<String, Value>) -> Self {
        Self { items }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.put(key, value);
        }
        settings
    }
}

impl<'a> IntoIterator for &'a Settings {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Fluent builder for the settings a client is created with.
///
/// Starts empty: only the keys that are set override the defaults once the
/// client merges them.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    inner: Settings,
}

impl SettingsBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut Settings)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn driver<S: Into<String>>(self, name: S) -> Self { self.map(|s| s.put(DRIVER, name.into())) }
    pub fn timeout(self, timeout: Duration) -> Self { self.map(|s| s.put(TIMEOUT, seconds(timeout))) }
    pub fn allow_redirects(self, on: bool) -> Self { self.map(|s| s.put(ALLOW_REDIRECTS, on)) }
    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|s| s.put(USER_AGENT, ua.into())) }
    pub fn forbid_cache(self, on: bool) -> Self { self.map(|s| s.put(FORBID_CACHE, on)) }

    /// Any other key, recognized or not.
    pub fn option(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map(|s| s.put(key, value))
    }

    /// Adds a named outgoing header.
    pub fn header<N: Into<String>, V: Into<String>>(self, name: N, value: V) -> Self {
        self.map(|s| match headers_entry(s) {
            Value::Object(map) => {
                map.insert(name.into(), Value::String(value.into()));
            }
            Value::Array(list) => {
                list.push(Value::String(format!("{}: {}", name.into(), value.into())));
            }
            _ => {}
        })
    }

    /// Adds a raw header line that is sent verbatim.
    pub fn raw_header<S: Into<String>>(self, line: S) -> Self {
        self.map(|s| match headers_entry(s) {
            Value::Object(map) => {
                let index = (map.len()..)
                    .map(|i| i.to_string())
                    .find(|key| !map.contains_key(key))
                    .unwrap_or_default();
                map.insert(index, Value::String(line.into()));
            }
            Value::Array(list) => list.push(Value::String(line.into())),
            _ => {}
        })
    }

    pub fn build(self) -> Settings {
        self.inner
    }
}

/// Returns the `headers` entry, replacing anything that is not a container.
fn headers_entry(settings: &mut Settings) -> &mut Value {
    let entry = settings
        .items
        .entry(HEADERS)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() && !entry.is_array() {
        *entry = Value::Object(Map::new());
    }
    entry
}

fn seconds(d: Duration) -> Value {
    if d.subsec_nanos() == 0 {
        Value::from(d.as_secs())
    } else {
        Value::from(d.as_secs_f64())
    }
}
