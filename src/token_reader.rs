use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    AccessToken, RequestToken, Result, TokenReaderError, TokenReaderResult, OAUTH_TOKEN_KEY,
    OAUTH_TOKEN_SECRET_KEY, UID_KEY,
};

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl From<TokenResponse> for RequestToken {
    fn from(resp: TokenResponse) -> Self {
        RequestToken::new(resp.oauth_token, resp.oauth_token_secret)
    }
}

impl TokenResponse {
    /// Requires the `uid` field the access-token endpoint returns.
    pub fn into_access_token(mut self, text: &str) -> TokenReaderResult<AccessToken> {
        match self.remain.remove(UID_KEY) {
            Some(uid) => Ok(AccessToken {
                token: self.oauth_token,
                token_secret: self.oauth_token_secret,
                uid,
            }),
            None => Err(TokenReaderError::TokenKeyNotFound(UID_KEY, text.to_string())),
        }
    }
}

/// Parse a URL-encoded token response body.
pub trait TokenReader: private::Sealed {
    fn parse_oauth_token(&self) -> Result<TokenResponse>;
}

impl TokenReader for str {
    fn parse_oauth_token(&self) -> Result<TokenResponse> {
        Ok(read_oauth_token(self)?)
    }
}

impl TokenReader for [u8] {
    fn parse_oauth_token(&self) -> Result<TokenResponse> {
        Ok(read_oauth_token(&String::from_utf8_lossy(self))?)
    }
}

pub(crate) fn read_oauth_token(text: &str) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.trim().as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_KEY,
            text.to_string(),
        )),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text.to_string(),
        )),
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for str {}
    impl Sealed for [u8] {}
}
