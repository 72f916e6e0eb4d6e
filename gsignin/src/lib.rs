//! Google Sign-In for installed apps.
//!
//! Implements the OAuth 2.0 authorization code flow with PKCE (RFC 7636)
//! against Google's endpoints:
//!
//! 1. A fresh [`ProofKeyForCodeExchange`] is generated.
//! 2. The consent URL is built from the client id and the PKCE challenge.
//! 3. A [`WebAuthenticationSession`] shows it to the user and waits for the
//!    redirect back to the app.
//! 4. The `code` from the redirect is exchanged for tokens together with the
//!    PKCE verifier ([`OAuthTokenGetter`]).
//! 5. The returned ID token is decoded into an [`IdToken`].
//!
//! The browser part is left to the host, which implements
//! [`WebAuthenticationSession`].
//!
//! ```rust,no_run
//! # use gsignin::*;
//! # async fn example(session: impl WebAuthenticationSession + 'static) -> Result<()> {
//! let config = SignInConfig::new(
//!     "123.apps.googleusercontent.com",
//!     "456.apps.googleusercontent.com",
//! );
//! let token_getter = GoogleOAuthTokenGetter::new(reqwest::Client::new())?;
//!
//! let authenticator = GoogleAuthenticator::builder(config)
//!     .with_session(session)
//!     .with_token_getter(token_getter)
//!     .build()?;
//!
//! let id_token = authenticator.get_oauth_token().await?;
//! println!("signed in as {}", id_token.email);
//! # Ok(())
//! # }
//! ```

pub use self::authenticator::{GoogleAuthenticator, GoogleAuthenticatorBuilder, SignIn};
pub use self::client_id::GoogleClientId;
pub use self::config::SignInConfig;
pub use self::error::{Error, ErrorKind, Result};
pub use self::jwt::{IdToken, JsonWebToken};
pub use self::pkce::{CodeVerifier, Method, ProofKeyForCodeExchange};
pub use self::random::{OsSecureRandom, SecureRandom};
pub use self::session::{
    PresentedSession, SessionCompletion, SessionCompletionFuture, WebAuthenticationSession,
    completion_channel,
};
pub use self::token::{
    GoogleOAuthTokenGetter, OAuthTokenGetter, OAuthTokenRequestBody, OAuthTokenResponseBody,
};
pub use self::verify::IdTokenVerifier;

pub mod authorization;
pub mod base64url;
pub mod jwt;
pub mod random;
pub mod session;
pub mod token;
pub mod verify;

mod authenticator;
mod client_id;
mod config;
mod error;
mod pkce;
