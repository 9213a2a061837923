use http::Method;
use url::form_urlencoded;

use crate::errors::{NetError, Result};

/// Methods every built-in driver accepts.
pub const ALLOWED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

pub fn is_allowed(method: &Method) -> bool {
    ALLOWED_METHODS.contains(method)
}

/// Ordered form fields. Sent as the query string for GET and as the
/// `application/x-www-form-urlencoded` body for POST.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.push(key, value);
        self
    }

    pub fn push<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Form-urlencodes the fields (`a b` becomes `a+b`).
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A single request as handed to a driver.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub params: Params,
}

impl Request {
    /// Fails with [`NetError::UnsupportedMethod`] for methods outside [`ALLOWED_METHODS`].
    pub fn new(method: Method, url: impl Into<String>, params: Params) -> Result<Self> {
        if !is_allowed(&method) {
            return Err(NetError::UnsupportedMethod(method));
        }

        Ok(Self {
            method,
            url: url.into(),
            params,
        })
    }

    /// URL the request is sent to. GET carries its params in the query string.
    pub fn target_url(&self) -> String {
        if self.method == Method::GET && !self.params.is_empty() {
            append_query(&self.url, &self.params.encode())
        } else {
            self.url.clone()
        }
    }

    /// Encoded form body. Only POST has one.
    pub fn form_body(&self) -> Option<String> {
        (self.method == Method::POST).then(|| self.params.encode())
    }
}

/// Appends `query` to `url` with `?`, or `&` when the URL already has a query.
/// A fragment stays at the end.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    let mut out = format!("{base}{separator}{query}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
