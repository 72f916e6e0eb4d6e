use serde::{Deserialize, Serialize};
use url::Url;

use crate::authorization::GOOGLE_AUTHORIZATION_ENDPOINT;
use crate::client_id::GoogleClientId;
use crate::error::{Error, Result};
use crate::token::GOOGLE_TOKEN_ENDPOINT;
use crate::verify::GOOGLE_JWKS_ENDPOINT;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignInConfig {
    /// OAuth client id of the installed app.
    ///
    /// Example: `123-abc.apps.googleusercontent.com`
    pub client_id: String,

    /// Client id of the backend the ID token is meant for.
    pub audience: String,

    /// Callback URL scheme the session waits for.
    ///
    /// Default: the client id's reversed segments.
    pub scheme: Option<String>,

    /// Redirect URI sent to Google.
    ///
    /// Default: the client id's `<reversed client id>:/oauth2callback`.
    pub redirect_uri: Option<Url>,

    pub authorization_endpoint: Url,

    pub token_endpoint: Url,

    pub jwks_endpoint: Url,

    /// Check the ID token signature against Google's keys.
    ///
    /// Default: `false`
    pub verify_id_token: bool,
}

impl Default for SignInConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            audience: String::new(),
            scheme: None,
            redirect_uri: None,
            authorization_endpoint: const_url(GOOGLE_AUTHORIZATION_ENDPOINT),
            token_endpoint: const_url(GOOGLE_TOKEN_ENDPOINT),
            jwks_endpoint: const_url(GOOGLE_JWKS_ENDPOINT),
            verify_id_token: false,
        }
    }
}

impl SignInConfig {
    pub fn new(client_id: &str, audience: &str) -> Self {
        Self {
            client_id: client_id.to_owned(),
            audience: audience.to_owned(),
            ..Default::default()
        }
    }

    pub fn google_client_id(&self) -> Result<GoogleClientId> {
        self.client_id.parse()
    }

    /// Redirect URI and callback scheme after defaults are applied.
    pub fn resolve_redirect(&self, client_id: &GoogleClientId) -> (String, String) {
        match (&self.redirect_uri, &self.scheme) {
            (Some(uri), scheme) => {
                let scheme = scheme.clone().unwrap_or_else(|| uri.scheme().to_owned());
                (uri.to_string(), scheme)
            }
            (None, Some(scheme)) => (client_id.default_redirect_uri(), scheme.clone()),
            (None, None) => (client_id.default_redirect_uri(), client_id.default_scheme()),
        }
    }

    /// Applies `GOOGLE_CLIENT_ID` and `GOOGLE_AUDIENCE` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(client_id) = std::env::var("GOOGLE_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Ok(audience) = std::env::var("GOOGLE_AUDIENCE") {
            self.audience = audience;
        }
        self
    }

    /// The audience is the backend's client id and must be well-formed too.
    pub fn validate(&self) -> Result<()> {
        self.google_client_id()?;
        if GoogleClientId::new(&self.audience).is_none() {
            return Err(Error::InvalidClientId(self.audience.clone()));
        }
        Ok(())
    }
}

fn const_url(url: &'static str) -> Url {
    // All callers pass compile-time constants.
    Url::parse(url).expect("static URL must be valid")
}
