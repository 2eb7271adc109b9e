/*!
dropbox-oauth1: a Dropbox v1 REST client signed with OAuth 1.0.

# Overview

Requests are signed with HMAC-SHA1 and carry their `oauth_*` parameters
in the query string (GET, PUT) or the form body (POST). The crate is
layered leaves first:

- [`Transport`] moves bytes ([`ReqwestTransport`] in production),
- [`Signer`] computes signatures,
- [`Session`] runs the three-legged flow and signs every call,
- [`Client`] exposes account info, metadata, download and upload.

# How to use

## Authorizing the application

```no_run
use dropbox_oauth1::{AccessType, Credentials, Session};

# fn run() -> dropbox_oauth1::Result<()> {
let credentials = Credentials::new("[APP_KEY]", "[APP_SECRET]");
let session = Session::new(credentials, AccessType::AppFolder)?;

// step 1: acquire request token & token secret
let request_token = session.obtain_request_token()?;

// step 2: let the user approve the application
let url = session.build_authorize_url(&request_token, None, Some("en-US"))?;
println!("please visit: {}", url);

// step 3: exchange the approved request token
let session = session.obtain_access_token(request_token)?;
println!("uid: {}", session.access_token().uid);
# Ok(())
# }
```

## Listing and transferring files

```no_run
use std::path::Path;
use dropbox_oauth1::{AccessToken, AccessType, Client, Credentials, MetadataOptions, Session};

# fn run(token: AccessToken) -> dropbox_oauth1::Result<()> {
let credentials = Credentials::new("[APP_KEY]", "[APP_SECRET]");
let session = Session::new(credentials, AccessType::AppFolder)?.authorize(token);
let client = Client::new(session);

let listing = client.metadata("/", &MetadataOptions::default())?;
println!("{:#}", listing);

let file = client.get_file("/test.png", Some(Path::new("./test.png")), None)?;
println!("{} ({:?})", file.name, file.mime);

let meta = client.put_file(Path::new("./report.pdf"), "/", None, true)?;
println!("{:#}", meta);
# Ok(())
# }
```
*/
mod client;
mod error;
mod secrets;
mod session;
mod signer;
mod store;
mod token_reader;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod testing;

// exposed to external program
pub use client::{Client, FileDownload, MetadataOptions, MAX_UPLOAD_SIZE};
pub use error::{Error, Result, TokenReaderError, TokenReaderResult, UNKNOWN_ERROR_MESSAGE};
pub use secrets::{
    AccessToken, AccessType, Credentials, RequestToken, Secrets, SecretsProvider,
    TokenSecretsProvider,
};
pub use session::{Authorized, Endpoints, Session, Unauthenticated};
pub use signer::{
    encode, sign, signature_base_string, signing_key, OAuthParameters, Parameters,
    SignedRequest, Signer, HMAC_SHA1, OAUTH_VERSION,
};
pub use store::{FileTokenStore, TokenStore};
pub use token_reader::{TokenReader, TokenResponse};
pub use transport::{ReqwestTransport, Response, ResponseBody, Transport};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `locale` on the authorize page.
pub const LOCALE_KEY: &str = "locale";
/// Represents `uid` in the access token response.
pub const UID_KEY: &str = "uid";

// crate-private constant variables
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
