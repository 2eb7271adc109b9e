use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

use crate::{
    SecretsProvider, OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERSION_KEY,
};

/// Request parameters keyed by name.
///
/// A `None` value marks a parameter that is neither signed nor sent.
pub type Parameters = BTreeMap<String, Option<String>>;

/// Only the `oauth_signature_method` this crate implements.
pub const HMAC_SHA1: &str = "HMAC-SHA1";
/// The only valid `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

// RFC 3986 unreserved characters stay as-is
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode per RFC 3986 (space becomes `%20`).
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

/// Builds `METHOD&enc(url)&enc(k1=v1&k2=v2...)`.
///
/// Keys are visited in byte order and `None` values are skipped.
pub fn signature_base_string(method: &Method, url: &str, parameters: &Parameters) -> String {
    let joined = parameters
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| format!("{}={}", encode(key), encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method.as_str(), encode(url), encode(&joined))
}

/// `consumer_secret&token_secret`, with an empty token segment when absent.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!("{}&{}", consumer_secret, token_secret.unwrap_or_default())
}

/// base64(HMAC-SHA1(signing key, base string)).
pub fn sign(
    method: &Method,
    url: &str,
    parameters: &Parameters,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> String {
    let base = signature_base_string(method, url, parameters);
    let key = signing_key(consumer_secret, token_secret);
    let mut mac = <Hmac<Sha1>>::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(base.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// A request whose parameter set already carries `oauth_signature`.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub parameters: Parameters,
    pub signature: String,
}

impl SignedRequest {
    /// Parameters with a value, in the order they were signed.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}

#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider) -> Self {
        Signer { secrets }
    }

    pub fn generate_signature(
        &self,
        method: &Method,
        url: &str,
        parameters: &Parameters,
    ) -> String {
        let (_, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (_, token_secret) = self.secrets.get_token_option_pair();
        sign(method, url, parameters, consumer_secret, token_secret)
    }

    /// Signs `parameters` and stores the result as `oauth_signature`.
    pub fn sign_request(
        &self,
        method: Method,
        url: &str,
        mut parameters: Parameters,
    ) -> SignedRequest {
        // a stale signature must not feed into the new one
        parameters.remove(OAUTH_SIGNATURE_KEY);
        let signature = self.generate_signature(&method, url, &parameters);
        parameters.insert(OAUTH_SIGNATURE_KEY.to_string(), Some(signature.clone()));
        SignedRequest {
            method,
            url: url.to_string(),
            parameters,
            signature,
        }
    }
}

/// Per-request OAuth protocol parameters.
///
/// Nonce and timestamp are generated freshly on every [`build`](Self::build)
/// unless pinned.
#[derive(Debug, Clone)]
pub struct OAuthParameters {
    nonce: Option<String>,
    timestamp: Option<u64>,
    version: bool,
}

impl Default for OAuthParameters {
    fn default() -> Self {
        OAuthParameters {
            nonce: None,
            timestamp: None,
            version: true,
        }
    }
}

impl OAuthParameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// pin the oauth_nonce value
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// pin the oauth_timestamp value
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// When `true` (the default), oauth_version is sent as "1.0".
    /// Otherwise it is left out of the request.
    pub fn version<T>(self, version: T) -> Self
    where
        T: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    /// Produces the standard `oauth_*` parameter set.
    pub fn build(&self, consumer_key: &str, token: Option<&str>) -> Parameters {
        let mut params = Parameters::new();
        params.insert(OAUTH_CONSUMER_KEY.to_string(), Some(consumer_key.to_string()));
        params.insert(
            OAUTH_NONCE_KEY.to_string(),
            Some(self.nonce.clone().unwrap_or_else(generate_nonce)),
        );
        params.insert(
            OAUTH_SIGNATURE_METHOD_KEY.to_string(),
            Some(HMAC_SHA1.to_string()),
        );
        params.insert(
            OAUTH_TIMESTAMP_KEY.to_string(),
            Some(self.timestamp.unwrap_or_else(unix_timestamp).to_string()),
        );
        if let Some(token) = token {
            params.insert(OAUTH_TOKEN_KEY.to_string(), Some(token.to_string()));
        }
        if self.version {
            params.insert(OAUTH_VERSION_KEY.to_string(), Some(OAUTH_VERSION.to_string()));
        }
        params
    }
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
