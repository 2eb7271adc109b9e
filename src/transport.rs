//! Blocking HTTP plumbing shared by the session and the API client.
//!
//! [`Transport`] only moves bytes; turning a raw exchange into a
//! [`Response`] (JSON decoding, error extraction) happens in
//! [`Response::from_raw`] so every transport behaves the same.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use http::header::CONTENT_LENGTH;
use http::Method;
use reqwest::blocking::{Body, Client as ReqwestClient};
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{Error, Result, UNKNOWN_ERROR_MESSAGE};

/// Connect and overall timeout applied to every request.
pub const TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("Dropbox REST Rust Client/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// Lower-cased header name to value.
pub type Headers = HashMap<String, String>;

/// Parses a raw HTTP header block into [`Headers`].
///
/// The status line is dropped, blank lines are skipped and each line is
/// split on its first `": "` only.
pub fn parse_header_block(raw: &str) -> Headers {
    raw.split("\r\n")
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut split = line.splitn(2, ": ");
            (
                split.next().unwrap_or_default().to_lowercase(),
                split.next().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Streamed from a local file.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Return the body as bytes instead of decoding JSON.
    pub raw: bool,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        HttpRequest {
            method,
            url,
            headers: Vec::new(),
            body: RequestBody::Empty,
            raw: false,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// A `PUT` whose body is the content of `file`.
    pub fn put<P: Into<PathBuf>>(url: Url, file: P) -> Self {
        HttpRequest {
            body: RequestBody::File(file.into()),
            ..Self::new(Method::PUT, url)
        }
    }

    /// Appends `pairs` to the query string.
    pub fn query<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.url.query_pairs_mut().extend_pairs(pairs);
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        self
    }

    pub fn form<'a, I>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HttpRequest {
            body: RequestBody::Form(pairs),
            ..self
        }
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn raw(self, raw: bool) -> Self {
        HttpRequest { raw, ..self }
    }
}

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// Decoded JSON; `Value::Null` for a raw body.
    pub fn into_json(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Raw(_) => Value::Null,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ResponseBody::Json(value) => value.to_string().into_bytes(),
            ResponseBody::Raw(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: ResponseBody,
    pub headers: Headers,
}

impl Response {
    /// Interprets a raw exchange.
    ///
    /// # Errors
    ///
    /// `Error::Api` for any status above 400, whatever `raw` says, and
    /// `Error::Json` when a non-raw success body is not JSON.
    pub fn from_raw(response: RawResponse, raw: bool) -> Result<Self> {
        let RawResponse {
            status,
            headers,
            body,
        } = response;
        if status > 400 {
            let message = error_message(&body);
            warn!(status, %message, "request rejected");
            return Err(Error::Api { status, message });
        }
        let body = if raw {
            ResponseBody::Raw(body)
        } else if body.iter().all(u8::is_ascii_whitespace) {
            ResponseBody::Json(Value::Null)
        } else {
            ResponseBody::Json(serde_json::from_slice(&body)?)
        };
        Ok(Response {
            status,
            body,
            headers,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut map)) => match map.remove("error") {
            Some(Value::String(message)) if !message.is_empty() => message,
            Some(Value::Null) | Some(Value::String(_)) | None => UNKNOWN_ERROR_MESSAGE.to_string(),
            Some(other) => other.to_string(),
        },
        _ => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

/// Moves one request over the network.
///
/// Implementations must not interpret the status code; that is left to
/// [`Response::from_raw`].
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse>;

    /// Executes `request` and interprets the outcome.
    fn request(&self, request: HttpRequest) -> Result<Response> {
        let raw = request.raw;
        Response::from_raw(self.execute(request)?, raw)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        (**self).execute(request)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: ReqwestClient,
}

impl ReqwestTransport {
    /// Constructs a new `ReqwestTransport`.
    ///
    /// # Errors
    ///
    /// `Error::Transport` when the TLS backend or client cannot be set up.
    pub fn new() -> Result<Self> {
        let inner = ReqwestClient::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .connect_timeout(TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .referer(true)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self::new_with_client(inner))
    }

    /// Constructs a new `ReqwestTransport` with specifying inner `reqwest::blocking::Client`.
    pub fn new_with_client(client: ReqwestClient) -> Self {
        ReqwestTransport { inner: client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        debug!(method = %request.method, path = request.url.path(), "sending request");
        let mut builder = self.inner.request(request.method, request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::File(path) => {
                let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
                let len = file.metadata().map_err(|e| Error::io(&path, e))?.len();
                builder
                    .header(CONTENT_LENGTH, len)
                    .body(Body::sized(file, len))
            }
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes()?.to_vec();
        debug!(status, bytes = body.len(), "received response");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
