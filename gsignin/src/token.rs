use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;
use url::form_urlencoded;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::jwt::IdToken;

pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const GRANT_TYPE: &str = "authorization_code";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Form body of the authorization code exchange.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct OAuthTokenRequestBody {
    pub client_id: String,
    /// Installed-app credentials have no secret; Google expects the field
    /// to be present and empty.
    pub client_secret: String,
    pub audience: String,
    pub code: String,
    pub code_verifier: String,
    #[zeroize(skip)]
    pub grant_type: &'static str,
    pub redirect_uri: String,
}

impl OAuthTokenRequestBody {
    pub fn new(
        client_id: &str,
        audience: &str,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Self {
        Self {
            client_id: client_id.to_owned(),
            client_secret: String::new(),
            audience: audience.to_owned(),
            code: code.to_owned(),
            code_verifier: code_verifier.to_owned(),
            grant_type: GRANT_TYPE,
            redirect_uri: redirect_uri.to_owned(),
        }
    }

    /// `application/x-www-form-urlencoded` encoding of the body.
    pub fn to_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("code", &self.code)
            .append_pair("code_verifier", &self.code_verifier)
            .append_pair("grant_type", self.grant_type)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("audience", &self.audience)
            .finish()
    }
}

impl fmt::Debug for OAuthTokenRequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenRequestBody")
            .field("client_id", &self.client_id)
            .field("audience", &self.audience)
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// JSON body returned by the token endpoint.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct OAuthTokenResponseBody {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub token_type: String,
}

impl OAuthTokenResponseBody {
    /// Decodes `id_token`. `None` when it is absent, not a JWT, or lacks the
    /// `name`/`email` claims.
    pub fn id_token(&self) -> Option<IdToken> {
        IdToken::parse(self.id_token.as_deref()?)
    }
}

impl fmt::Debug for OAuthTokenResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenResponseBody")
            .field("expires_in", &self.expires_in)
            .field("has_id_token", &self.id_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Error body of the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges an authorization code for tokens.
#[async_trait]
pub trait OAuthTokenGetter: Send + Sync {
    async fn get_token(&self, body: &OAuthTokenRequestBody) -> Result<OAuthTokenResponseBody>;
}

/// [`OAuthTokenGetter`] talking to Google over HTTPS.
///
/// Does not retry. Timeouts are whatever the given client is built with.
#[derive(Clone)]
pub struct GoogleOAuthTokenGetter {
    http_client: reqwest::Client,
    token_endpoint: Url,
}

impl GoogleOAuthTokenGetter {
    pub fn new(http_client: reqwest::Client) -> Result<Self> {
        Ok(Self::with_endpoint(
            http_client,
            Url::parse(GOOGLE_TOKEN_ENDPOINT)?,
        ))
    }

    pub fn with_endpoint(http_client: reqwest::Client, token_endpoint: Url) -> Self {
        Self {
            http_client,
            token_endpoint,
        }
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }
}

#[async_trait]
impl OAuthTokenGetter for GoogleOAuthTokenGetter {
    async fn get_token(&self, body: &OAuthTokenRequestBody) -> Result<OAuthTokenResponseBody> {
        tracing::debug!(endpoint = %self.token_endpoint, "exchanging authorization code");

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT, "application/json")
            .body(body.to_form())
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let (error, description) = match serde_json::from_slice::<OAuthErrorBody>(&bytes) {
                Ok(body) => (body.error, body.error_description),
                Err(_) => (
                    status.canonical_reason().unwrap_or("unknown").to_owned(),
                    None,
                ),
            };
            tracing::warn!(status = status.as_u16(), %error, "token endpoint rejected the request");
            return Err(Error::TokenEndpoint {
                status: status.as_u16(),
                error,
                description,
            });
        }

        let token = serde_json::from_slice::<OAuthTokenResponseBody>(&bytes)?;
        tracing::debug!(?token, "received token response");
        Ok(token)
    }
}
