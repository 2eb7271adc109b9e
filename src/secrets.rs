use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

pub trait SecretsProvider {
    fn get_consumer_key_pair(&self) -> (&str, &str);

    fn get_token_pair_option(&self) -> Option<(&str, &str)>;

    fn get_token_option_pair(&self) -> (Option<&str>, Option<&str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or((None, None))
    }
}

/// Anything carrying an OAuth token and its secret.
pub trait TokenSecretsProvider {
    fn get_token_pair(&self) -> (&str, &str);
}

/// The application's consumer key and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
}

impl Credentials {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Credentials {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

/// Which namespace file paths are resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Full account access.
    Dropbox,
    /// Sandboxed application folder.
    AppFolder,
}

impl AccessType {
    /// Path segment prefixed to every remote file path.
    pub fn root(self) -> &'static str {
        match self {
            AccessType::Dropbox => "dropbox",
            AccessType::AppFolder => "sandbox",
        }
    }
}

impl Default for AccessType {
    fn default() -> Self {
        AccessType::AppFolder
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Dropbox => f.write_str("dropbox"),
            AccessType::AppFolder => f.write_str("app_folder"),
        }
    }
}

impl FromStr for AccessType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dropbox" => Ok(AccessType::Dropbox),
            "app_folder" => Ok(AccessType::AppFolder),
            other => Err(Error::Validation(format!(
                "access type must be dropbox or app_folder, but {} is specified",
                other
            ))),
        }
    }
}

/// Temporary token driving the user through the consent screen.
///
/// Deliberately not `Clone`: exchanging it for an access token consumes it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
    #[serde(rename = "oauth_token")]
    pub token: String,
    #[serde(rename = "oauth_token_secret")]
    pub token_secret: String,
}

impl RequestToken {
    pub fn new<TKey, TSecret>(token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        RequestToken {
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }
}

impl TokenSecretsProvider for RequestToken {
    fn get_token_pair(&self) -> (&str, &str) {
        (&self.token, &self.token_secret)
    }
}

/// Long-lived token used for every API call once authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "oauth_token")]
    pub token: String,
    #[serde(rename = "oauth_token_secret")]
    pub token_secret: String,
    pub uid: String,
}

impl TokenSecretsProvider for AccessToken {
    fn get_token_pair(&self) -> (&str, &str) {
        (&self.token, &self.token_secret)
    }
}

/// Borrowed view over the credentials and, optionally, a token.
#[derive(Debug, Clone, Copy)]
pub struct Secrets<'a> {
    credentials: &'a Credentials,
    token: Option<(&'a str, &'a str)>,
}

impl<'a> Secrets<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Secrets {
            credentials,
            token: None,
        }
    }

    pub fn token<T: TokenSecretsProvider>(self, token: &'a T) -> Self {
        Secrets {
            token: Some(token.get_token_pair()),
            ..self
        }
    }
}

impl SecretsProvider for Secrets<'_> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (
            &self.credentials.consumer_key,
            &self.credentials.consumer_secret,
        )
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CONSUMER_KEY: &str = "<CONSUMER_KEY>";
    static CONSUMER_SECRET: &str = "<CONSUMER_SECRET>";

    #[test]
    fn secrets_without_token() {
        let credentials = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET);
        let secrets = Secrets::new(&credentials);
        assert_eq!(
            secrets.get_consumer_key_pair(),
            (CONSUMER_KEY, CONSUMER_SECRET)
        );
        assert_eq!(secrets.get_token_option_pair(), (None, None));
    }

    #[test]
    fn secrets_with_token() {
        let credentials = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET);
        let token = RequestToken::new("<TOKEN>", "<TOKEN_SECRET>");
        let secrets = Secrets::new(&credentials).token(&token);
        assert_eq!(
            secrets.get_token_pair_option(),
            Some(("<TOKEN>", "<TOKEN_SECRET>"))
        );
    }

    #[test]
    fn debug_hides_consumer_secret() {
        let credentials = Credentials::new(CONSUMER_KEY, CONSUMER_SECRET);
        let printed = format!("{:?}", credentials);
        assert!(printed.contains(CONSUMER_KEY));
        assert!(!printed.contains(CONSUMER_SECRET));
    }

    #[test]
    fn access_type_roots() {
        assert_eq!("dropbox".parse::<AccessType>().unwrap().root(), "dropbox");
        assert_eq!(
            "app_folder".parse::<AccessType>().unwrap().root(),
            "sandbox"
        );
        assert!("sandbox".parse::<AccessType>().is_err());
        assert_eq!(AccessType::AppFolder.to_string(), "app_folder");
    }

    #[test]
    fn access_token_uses_wire_names() {
        let token = AccessToken {
            token: "t".to_string(),
            token_secret: "s".to_string(),
            uid: "42".to_string(),
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"oauth_token": "t", "oauth_token_secret": "s", "uid": "42"})
        );
    }
}
