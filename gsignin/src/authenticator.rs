use std::sync::Arc;

use url::Url;

use crate::authorization::{authorization_code, authorization_url};
use crate::client_id::GoogleClientId;
use crate::config::SignInConfig;
use crate::error::{Error, Result};
use crate::jwt::IdToken;
use crate::pkce::ProofKeyForCodeExchange;
use crate::random::{OsSecureRandom, SecureRandom};
use crate::session::{PresentedSession, WebAuthenticationSession};
use crate::token::{OAuthTokenGetter, OAuthTokenRequestBody, OAuthTokenResponseBody};
use crate::verify::IdTokenVerifier;

type Session = Arc<dyn WebAuthenticationSession>;
type TokenGetter = Arc<dyn OAuthTokenGetter>;

pub struct GoogleAuthenticatorBuilder<MandatoryFields = (Session, TokenGetter)> {
    config: SignInConfig,
    random: Arc<dyn SecureRandom>,
    verifier: Option<Arc<IdTokenVerifier>>,
    mandatory_fields: MandatoryFields,
}

impl GoogleAuthenticatorBuilder {
    pub fn build(self) -> Result<GoogleAuthenticator> {
        let (session, token_getter) = self.mandatory_fields;
        let config = self.config;

        let client_id = config.google_client_id()?;
        let (redirect_uri, callback_scheme) = config.resolve_redirect(&client_id);

        Ok(GoogleAuthenticator {
            client_id,
            audience: config.audience,
            redirect_uri,
            callback_scheme,
            authorization_endpoint: config.authorization_endpoint,
            session,
            token_getter,
            random: self.random,
            verifier: self.verifier,
        })
    }
}

impl<T2> GoogleAuthenticatorBuilder<((), T2)> {
    pub fn with_session<S>(self, session: S) -> GoogleAuthenticatorBuilder<(Session, T2)>
    where
        S: WebAuthenticationSession + 'static,
    {
        let (_, token_getter) = self.mandatory_fields;

        GoogleAuthenticatorBuilder {
            config: self.config,
            random: self.random,
            verifier: self.verifier,
            mandatory_fields: (Arc::new(session) as Session, token_getter),
        }
    }
}

impl<T1> GoogleAuthenticatorBuilder<(T1, ())> {
    pub fn with_token_getter<G>(self, token_getter: G) -> GoogleAuthenticatorBuilder<(T1, TokenGetter)>
    where
        G: OAuthTokenGetter + 'static,
    {
        let (session, _) = self.mandatory_fields;

        GoogleAuthenticatorBuilder {
            config: self.config,
            random: self.random,
            verifier: self.verifier,
            mandatory_fields: (session, Arc::new(token_getter) as TokenGetter),
        }
    }
}

impl<T1, T2> GoogleAuthenticatorBuilder<(T1, T2)> {
    pub fn with_random<R: SecureRandom + 'static>(self, random: R) -> Self {
        Self {
            random: Arc::new(random),
            ..self
        }
    }

    pub fn with_verifier(self, verifier: Arc<IdTokenVerifier>) -> Self {
        Self {
            verifier: Some(verifier),
            ..self
        }
    }
}

/// Result of a completed sign-in.
#[derive(Debug)]
pub struct SignIn {
    pub id_token: IdToken,
    pub tokens: OAuthTokenResponseBody,
}

/// Runs Google Sign-In end to end.
///
/// Each call to [`sign_in`](Self::sign_in) is an independent attempt with its
/// own PKCE pair. Steps run strictly in order and any failure ends the
/// attempt; retrying means calling again.
pub struct GoogleAuthenticator {
    client_id: GoogleClientId,
    audience: String,
    redirect_uri: String,
    callback_scheme: String,
    authorization_endpoint: Url,
    session: Session,
    token_getter: TokenGetter,
    random: Arc<dyn SecureRandom>,
    verifier: Option<Arc<IdTokenVerifier>>,
}

impl GoogleAuthenticator {
    pub fn builder(config: SignInConfig) -> GoogleAuthenticatorBuilder<((), ())> {
        GoogleAuthenticatorBuilder {
            config,
            random: Arc::new(OsSecureRandom),
            verifier: None,
            mandatory_fields: ((), ()),
        }
    }

    pub fn client_id(&self) -> &GoogleClientId {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn callback_scheme(&self) -> &str {
        &self.callback_scheme
    }

    /// Consent page URL for `pkce`.
    pub fn authorization_url(&self, pkce: &ProofKeyForCodeExchange) -> Url {
        authorization_url(
            &self.authorization_endpoint,
            &self.client_id,
            pkce,
            &self.redirect_uri,
        )
    }

    /// Signs the user in and returns the identity Google asserted.
    pub async fn get_oauth_token(&self) -> Result<IdToken> {
        self.sign_in().await.map(|sign_in| sign_in.id_token)
    }

    /// Like [`get_oauth_token`](Self::get_oauth_token), but also hands back
    /// the access and refresh tokens.
    pub async fn sign_in(&self) -> Result<SignIn> {
        tracing::debug!(step = "start", client_id = %self.client_id, "starting Google sign-in");
        let pkce = ProofKeyForCodeExchange::make_random_with(self.random.as_ref())?;

        tracing::debug!(step = "building_url");
        let url = self.authorization_url(&pkce);

        tracing::debug!(step = "awaiting_user_interaction", scheme = %self.callback_scheme);
        let callback = {
            let _presented = PresentedSession::begin();
            self.session
                .authenticate(url, &self.callback_scheme)
                .await
                .inspect_err(|e| tracing::info!(%e, "authentication session ended without a callback"))?
        };

        tracing::debug!(step = "extracting_code");
        let code = authorization_code(&callback)?;

        tracing::debug!(step = "exchanging_token");
        let request = OAuthTokenRequestBody::new(
            self.client_id.as_str(),
            &self.audience,
            &code,
            pkce.code_verifier().as_str(),
            &self.redirect_uri,
        );
        drop(pkce);
        let tokens = self.token_getter.get_token(&request).await?;

        tracing::debug!(step = "decoding_id_token");
        let id_token = tokens
            .id_token()
            .ok_or(Error::TokenResponseDidNotIncludeIdToken)?;

        if let Some(verifier) = &self.verifier {
            tracing::debug!(step = "verifying_id_token");
            verifier.verify(&id_token).await?;
        }

        tracing::info!(email = %id_token.email, "Google sign-in completed");
        Ok(SignIn { id_token, tokens })
    }
}
