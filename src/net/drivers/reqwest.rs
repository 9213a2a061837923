//! `reqwest::blocking` driver.
//!
//! reqwest resolves redirects itself and hands back only the final response,
//! already split into parts. The driver writes those parts back out as a wire
//! response (status line, header lines, blank line, body) so the result goes
//! through the same [`Response::from_raw`] parsing as every other driver.
//!
//! The blocking `Client` owns the connection pool and a runtime thread, so the
//! driver builds it on first use and keeps it for its whole lifetime. Only the
//! request itself is prepared per call.
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method};
use reqwest::blocking::{Client, Request as WireRequest};
use reqwest::redirect::Policy;

use crate::config::Settings;
use crate::errors::{NetError, Result};
use crate::net::driver::{Driver, MAX_REDIRECTS};
use crate::net::headers::format_request_headers;
use crate::net::request::{Params, Request};
use crate::net::response::{Response, TransferInfo};

pub const NAME: &str = "reqwest";

/// Release line the crate is built against; `Cargo.toml` pins `reqwest` to it.
const REQWEST_SERIES: &str = "0.12";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

struct Prepared {
    client: Client,
    request: WireRequest,
    url: String,
}

pub struct ReqwestDriver {
    settings: Arc<Settings>,
    client: Option<Client>,
    prepared: Option<Prepared>,
}

impl ReqwestDriver {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            client: None,
            prepared: None,
        }
    }

    /// Shared client, built on first use. Clones share one connection pool.
    fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = self.build_client()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    fn build_client(&self) -> Result<Client> {
        let policy = if self.settings.allow_redirects() {
            Policy::limited(MAX_REDIRECTS as usize)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .redirect(policy)
            .timeout(self.settings.timeout());

        if let Some(user_agent) = self.settings.user_agent() {
            builder = builder.user_agent(user_agent);
        }

        if self.settings.forbid_cache() {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(builder.build()?)
    }

    fn build_request(&self, client: &Client, request: &Request, target: &str) -> Result<WireRequest> {
        let mut builder = client.request(request.method.clone(), target);

        if let Some(headers) = self.settings.headers() {
            for line in format_request_headers(headers, &request.method) {
                match parse_header_line(&line) {
                    Some((name, value)) => builder = builder.header(name, value),
                    None => log::warn!("skipping malformed header line '{line}'"),
                }
            }
        }

        match request.form_body() {
            Some(body) => builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body),
            None if request.method != Method::GET && !request.params.is_empty() => {
                log::warn!(
                    "{} request to {} does not send form data, {} field(s) ignored",
                    request.method,
                    target,
                    request.params.len()
                );
            }
            None => {}
        }

        Ok(builder.build()?)
    }
}

impl Driver for ReqwestDriver {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn name(&self) -> &'static str {
        NAME
    }

    fn version(&self) -> String {
        format!("reqwest/{REQWEST_SERIES} (blocking)")
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn prepare_request(&mut self, url: &str, method: &Method, params: &Params) -> Result<()> {
        self.prepared = None;

        let request = Request::new(method.clone(), url, params.clone())?;
        let target = request.target_url();

        let client = self.client()?;
        let wire = self.build_request(&client, &request, &target)?;
        log::debug!("prepared {} {}", request.method, target);

        self.prepared = Some(Prepared {
            client,
            request: wire,
            url: target,
        });
        Ok(())
    }

    fn send(&mut self) -> Result<Response> {
        let Prepared { client, request, url } = self.prepared.take().ok_or(NetError::NoPreparedRequest)?;
        let method = request.method().clone();

        let start = Instant::now();
        let response = client.execute(request)?;

        let status = response.status();
        let effective_url = response.url().to_string();

        let mut raw = format!("{:?} {}\r\n", response.version(), status).into_bytes();
        for (name, value) in response.headers() {
            raw.extend_from_slice(name.as_str().as_bytes());
            raw.extend_from_slice(b": ");
            raw.extend_from_slice(value.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(&response.bytes()?);

        let info = TransferInfo {
            http_code: Some(status.as_u16()),
            total_time: start.elapsed().as_secs_f64(),
            effective_url: Some(effective_url),
            redirect_count: None,
        };
        log::debug!(
            "{} {} -> {} ({} bytes in {:.3}s)",
            method,
            url,
            status.as_u16(),
            raw.len(),
            info.total_time
        );

        Ok(Response::from_raw(url, &raw, info))
    }

    fn driver_raw(&self) -> Option<&dyn Any> {
        self.prepared.as_ref().map(|p| &p.client as &dyn Any)
    }

    fn driver_raw_mut(&mut self) -> Option<&mut dyn Any> {
        self.prepared.as_mut().map(|p| &mut p.client as &mut dyn Any)
    }
}

/// Splits a `Name: value` line into a typed header pair.
fn parse_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = line.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}
