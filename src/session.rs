use std::path::Path;

use http::Method;
use tracing::debug;
use url::Url;

use crate::transport::{HttpRequest, ReqwestTransport, Response, Transport};
use crate::{
    AccessToken, AccessType, Credentials, Error, OAuthParameters, Parameters, RequestToken,
    Result, Secrets, SignedRequest, Signer, TokenReader, LOCALE_KEY, OAUTH_CALLBACK_KEY,
    OAUTH_TOKEN_KEY,
};

const REQUEST_TOKEN_PATH: &str = "/oauth/request_token";
const ACCESS_TOKEN_PATH: &str = "/oauth/access_token";

/// Base URLs of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// OAuth and metadata calls.
    pub api: String,
    /// File download and upload.
    pub content: String,
    /// User-facing consent page.
    pub authorize: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api: "https://api.dropbox.com/1".to_string(),
            content: "https://api-content.dropbox.com/1".to_string(),
            authorize: "https://www.dropbox.com/1/oauth/authorize".to_string(),
        }
    }
}

/// No token yet; request tokens are held by the caller between steps.
#[derive(Debug)]
pub struct Unauthenticated;

/// Holds the access token every call is signed with.
#[derive(Debug)]
pub struct Authorized {
    token: AccessToken,
}

/// OAuth1 session against the provider.
///
/// The state parameter makes authenticated calls unavailable until an
/// [`AccessToken`] is held.
#[derive(Debug)]
pub struct Session<T = ReqwestTransport, S = Unauthenticated> {
    transport: T,
    credentials: Credentials,
    access_type: AccessType,
    endpoints: Endpoints,
    parameters: OAuthParameters,
    state: S,
}

impl Session<ReqwestTransport, Unauthenticated> {
    /// Constructs a new `Session` over a fresh [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// `Error::Transport` when the HTTP client cannot be set up.
    pub fn new(credentials: Credentials, access_type: AccessType) -> Result<Self> {
        Ok(Self::with_transport(
            ReqwestTransport::new()?,
            credentials,
            access_type,
        ))
    }
}

impl<T: Transport> Session<T, Unauthenticated> {
    pub fn with_transport(transport: T, credentials: Credentials, access_type: AccessType) -> Self {
        Session {
            transport,
            credentials,
            access_type,
            endpoints: Endpoints::default(),
            parameters: OAuthParameters::new(),
            state: Unauthenticated,
        }
    }

    /// Requests a temporary, unauthorized token.
    ///
    /// # Errors
    ///
    /// `Error::Api` when the provider rejects the consumer credentials,
    /// `Error::TokenReader` when the response lacks the token pair.
    pub fn obtain_request_token(&self) -> Result<RequestToken> {
        let url = self.endpoint(&self.endpoints.api, REQUEST_TOKEN_PATH)?;
        let params = self
            .parameters
            .build(self.credentials.consumer_key(), None);
        let secrets = Secrets::new(&self.credentials);
        let signed = Signer::new(&secrets).sign_request(Method::GET, url.as_str(), params);

        debug!("requesting request token");
        let response = self
            .transport
            .request(HttpRequest::get(url).query(signed.pairs()).raw(true))?;
        let token = response.body.into_bytes().parse_oauth_token()?;
        Ok(token.into())
    }

    /// Exchanges an authorized request token for an access token.
    ///
    /// The request token is consumed; a failed exchange means starting over
    /// with [`obtain_request_token`](Self::obtain_request_token).
    ///
    /// # Errors
    ///
    /// `Error::Api` when the provider refuses the exchange,
    /// `Error::TokenReader` when the response lacks a field.
    pub fn obtain_access_token(self, authorized: RequestToken) -> Result<Session<T, Authorized>> {
        let url = self.endpoint(&self.endpoints.api, ACCESS_TOKEN_PATH)?;
        let params = self
            .parameters
            .build(self.credentials.consumer_key(), Some(authorized.token.as_str()));
        let secrets = Secrets::new(&self.credentials).token(&authorized);
        let signed = Signer::new(&secrets).sign_request(Method::POST, url.as_str(), params);

        debug!("exchanging request token");
        let response = self
            .transport
            .request(HttpRequest::post(url).form(signed.pairs()).raw(true))?;
        let text = String::from_utf8_lossy(&response.body.into_bytes()).into_owned();
        let token = text.parse_oauth_token()?.into_access_token(&text)?;
        debug!(uid = %token.uid, "access token obtained");
        Ok(self.authorize(token))
    }

    /// Resumes with a previously obtained access token.
    pub fn authorize(self, token: AccessToken) -> Session<T, Authorized> {
        Session {
            transport: self.transport,
            credentials: self.credentials,
            access_type: self.access_type,
            endpoints: self.endpoints,
            parameters: self.parameters,
            state: Authorized { token },
        }
    }
}

impl<T: Transport, S> Session<T, S> {
    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Replaces the provider base URLs.
    pub fn with_endpoints(self, endpoints: Endpoints) -> Self {
        Session { endpoints, ..self }
    }

    /// Replaces the OAuth parameter template used for every request.
    ///
    /// Fields left unset are generated per request. A pinned `nonce` or
    /// `timestamp` is reused on every call and lets the provider reject
    /// replays, so pin them only for deterministic signatures in tests.
    pub fn with_oauth_parameters(self, parameters: OAuthParameters) -> Self {
        Session { parameters, ..self }
    }

    /// URL of the consent page for `token`.
    ///
    /// Empty `callback` or `locale` values are left out.
    pub fn build_authorize_url(
        &self,
        token: &RequestToken,
        callback: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(OAUTH_TOKEN_KEY, &token.token);
            if let Some(callback) = callback.filter(|c| !c.is_empty()) {
                query.append_pair(OAUTH_CALLBACK_KEY, callback);
            }
            if let Some(locale) = locale.filter(|l| !l.is_empty()) {
                query.append_pair(LOCALE_KEY, locale);
            }
        }
        Ok(url)
    }

    fn endpoint(&self, base_url: &str, api_path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", base_url, api_path))?)
    }
}

impl<T: Transport> Session<T, Authorized> {
    pub fn access_token(&self) -> &AccessToken {
        &self.state.token
    }

    /// Signed call to `base_url + api_path`.
    ///
    /// `args` are merged over the OAuth parameters. GET (and any other
    /// method but POST) carries everything in the query string, POST in a
    /// form body. Uploads go through [`put`](Self::put).
    ///
    /// # Errors
    ///
    /// `Error::Api` for statuses above 400, `Error::Validation` for `PUT`.
    pub fn fetch(
        &self,
        method: Method,
        base_url: &str,
        api_path: &str,
        args: Parameters,
        raw: bool,
    ) -> Result<Response> {
        if method == Method::PUT {
            return Err(Error::Validation(
                "PUT needs an input file, use Session::put".to_string(),
            ));
        }
        let signed = self.sign(method, base_url, api_path, args)?;
        let url = Url::parse(&signed.url)?;
        let request = if signed.method == Method::POST {
            HttpRequest::post(url).form(signed.pairs())
        } else {
            HttpRequest::new(signed.method.clone(), url).query(signed.pairs())
        };
        self.transport.request(request.raw(raw))
    }

    /// Signed `PUT` streaming `input` as the body.
    ///
    /// All parameters travel in the query string since the body is the
    /// file payload.
    ///
    /// # Errors
    ///
    /// `Error::Io` when `input` cannot be opened, `Error::Api` for
    /// statuses above 400.
    pub fn put(
        &self,
        base_url: &str,
        api_path: &str,
        args: Parameters,
        input: &Path,
        raw: bool,
    ) -> Result<Response> {
        let signed = self.sign(Method::PUT, base_url, api_path, args)?;
        let url = Url::parse(&signed.url)?;
        let request = HttpRequest::put(url, input).query(signed.pairs());
        self.transport.request(request.raw(raw))
    }

    fn sign(
        &self,
        method: Method,
        base_url: &str,
        api_path: &str,
        args: Parameters,
    ) -> Result<SignedRequest> {
        let url = self.endpoint(base_url, api_path)?;
        let mut params = self
            .parameters
            .build(self.credentials.consumer_key(), Some(self.state.token.token.as_str()));
        params.extend(args);

        debug!(%method, path = url.path(), "signing request");
        let secrets = Secrets::new(&self.credentials).token(&self.state.token);
        Ok(Signer::new(&secrets).sign_request(method, url.as_str(), params))
    }
}
