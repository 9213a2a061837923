//! libcurl driver.
//!
//! Every request is configured on its own `Easy` handle. The handle lives in
//! the driver between `prepare_request` and `send`; `send` moves it out first,
//! so a failed transfer drops it (and `curl_easy_cleanup` runs).
//!
//! libcurl keeps its connection cache inside the handle. After a successful
//! transfer the handle is parked as idle and reset for the next request, which
//! lets keep-alive connections be reused. With `forbid_cache` set nothing is
//! parked and every request starts from a new handle.
//!
//! The header block is kept in the output (`CURLOPT_HEADER`), which means a
//! followed redirect leaves the intermediate responses in the buffer as well.
//! [`Response::from_raw`] only keeps the last one.
use std::any::Any;
use std::sync::Arc;

use curl::easy::{Easy, List};
use http::Method;

use crate::config::Settings;
use crate::errors::{NetError, Result};
use crate::net::driver::{Driver, MAX_REDIRECTS};
use crate::net::headers::format_request_headers;
use crate::net::request::{Params, Request};
use crate::net::response::{Response, TransferInfo};

pub const NAME: &str = "curl";

/// Request that has been configured but not sent yet.
struct Prepared {
    easy: Easy,
    method: Method,
    url: String,
}

pub struct CurlDriver {
    settings: Arc<Settings>,
    /// Handle of the last completed transfer, holding its open connections
    idle: Option<Easy>,
    prepared: Option<Prepared>,
}

impl CurlDriver {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            idle: None,
            prepared: None,
        }
    }

    /// Returns a handle with default options, reusing the idle one when
    /// connection reuse is allowed.
    fn handle(&mut self) -> Easy {
        match self.idle.take() {
            Some(mut easy) if !self.settings.forbid_cache() => {
                easy.reset();
                easy
            }
            _ => Easy::new(),
        }
    }

    fn configure(&self, easy: &mut Easy, request: &Request, target: &str) -> Result<()> {
        easy.url(target)?;
        easy.show_header(true)?;

        if self.settings.allow_redirects() {
            easy.follow_location(true)?;
            easy.max_redirections(MAX_REDIRECTS)?;
        } else {
            easy.follow_location(false)?;
        }

        if let Some(timeout) = self.settings.timeout() {
            easy.timeout(timeout)?;
        }

        if let Some(user_agent) = self.settings.user_agent() {
            easy.useragent(user_agent)?;
        }

        if let Some(headers) = self.settings.headers() {
            let lines = format_request_headers(headers, &request.method);
            if !lines.is_empty() {
                let mut list = List::new();
                for line in &lines {
                    list.append(line)?;
                }
                easy.http_headers(list)?;
            }
        }

        let forbid_cache = self.settings.forbid_cache();
        easy.fresh_connect(forbid_cache)?;
        easy.forbid_reuse(forbid_cache)?;

        match request.method {
            Method::GET => easy.get(true)?,
            Method::POST => {
                let body = request.form_body().unwrap_or_default();
                easy.post(true)?;
                easy.post_fields_copy(body.as_bytes())?;
            }
            _ => {
                if !request.params.is_empty() {
                    log::warn!(
                        "{} request to {} does not send form data, {} field(s) ignored",
                        request.method,
                        target,
                        request.params.len()
                    );
                }
                easy.custom_request(request.method.as_str())?;
            }
        }

        Ok(())
    }
}

impl Driver for CurlDriver {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn name(&self) -> &'static str {
        NAME
    }

    fn version(&self) -> String {
        curl::Version::get().version().to_string()
    }

    fn is_supported(&self) -> bool {
        curl::Version::get().protocols().any(|p| p == "http")
    }

    fn prepare_request(&mut self, url: &str, method: &Method, params: &Params) -> Result<()> {
        // Never keep a stale handle around, even if this request is rejected
        self.prepared = None;

        let request = Request::new(method.clone(), url, params.clone())?;
        let target = request.target_url();

        let mut easy = self.handle();
        self.configure(&mut easy, &request, &target)?;
        log::debug!("prepared {} {}", request.method, target);

        self.prepared = Some(Prepared {
            easy,
            method: request.method,
            url: target,
        });
        Ok(())
    }

    fn send(&mut self) -> Result<Response> {
        let Prepared { mut easy, method, url } = self.prepared.take().ok_or(NetError::NoPreparedRequest)?;

        let mut raw = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                raw.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let info = TransferInfo {
            http_code: easy
                .response_code()
                .ok()
                .filter(|code| *code != 0)
                .and_then(|code| u16::try_from(code).ok()),
            total_time: easy.total_time().map(|d| d.as_secs_f64()).unwrap_or_default(),
            effective_url: easy.effective_url().ok().flatten().map(str::to_string),
            redirect_count: easy.redirect_count().ok(),
        };
        log::debug!(
            "{} {} -> {:?} ({} bytes in {:.3}s)",
            method,
            url,
            info.http_code,
            raw.len(),
            info.total_time
        );

        if !self.settings.forbid_cache() {
            self.idle = Some(easy);
        }

        Ok(Response::from_raw(url, &raw, info))
    }

    fn driver_raw(&self) -> Option<&dyn Any> {
        self.prepared.as_ref().map(|p| &p.easy as &dyn Any)
    }

    fn driver_raw_mut(&mut self) -> Option<&mut dyn Any> {
        self.prepared.as_mut().map(|p| &mut p.easy as &mut dyn Any)
    }
}
