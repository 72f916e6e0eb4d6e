use url::Url;

use crate::client_id::GoogleClientId;
use crate::error::{Error, Result};
use crate::pkce::ProofKeyForCodeExchange;

pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const SCOPE: &str = "profile email";

/// Builds the consent page URL the user is sent to.
pub fn authorization_url(
    endpoint: &Url,
    client_id: &GoogleClientId,
    pkce: &ProofKeyForCodeExchange,
    redirect_uri: &str,
) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id.as_str())
        .append_pair("code_challenge", &pkce.code_challenge())
        .append_pair("code_challenge_method", pkce.method().as_str())
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE);
    url
}

/// Same as [`authorization_url`] against Google's endpoint and the client's
/// default redirect URI.
pub fn google_authorization_url(
    client_id: &GoogleClientId,
    pkce: &ProofKeyForCodeExchange,
) -> Result<Url> {
    let endpoint = Url::parse(GOOGLE_AUTHORIZATION_ENDPOINT)?;
    Ok(authorization_url(
        &endpoint,
        client_id,
        pkce,
        &client_id.default_redirect_uri(),
    ))
}

/// Whether an incoming URL is a redirect for this flow.
pub fn is_callback_url(url: &Url, scheme: &str) -> bool {
    url.scheme().eq_ignore_ascii_case(scheme)
}

/// Extracts the `code` query parameter from a callback URL.
pub fn authorization_code(callback: &Url) -> Result<String> {
    callback
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::UrlDidNotContainCodeParameter(callback.clone()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::pkce::Method;

    fn pkce() -> ProofKeyForCodeExchange {
        ProofKeyForCodeExchange::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk", Method::S256)
            .unwrap()
    }

    #[test]
    fn builds_consent_url() {
        let client_id = GoogleClientId::new("123.apps.googleusercontent.com").unwrap();
        let url = google_authorization_url(&client_id, &pkce()).unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(url.path(), "/o/oauth2/v2/auth");

        let keys = url.query_pairs().map(|(k, _)| k.into_owned()).collect::<Vec<_>>();
        assert_eq!(
            keys,
            [
                "client_id",
                "code_challenge",
                "code_challenge_method",
                "redirect_uri",
                "response_type",
                "scope"
            ]
        );

        let query = url.query_pairs().into_owned().collect::<HashMap<_, _>>();
        assert_eq!(query["client_id"], "123.apps.googleusercontent.com");
        assert_eq!(query["code_challenge"], "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(
            query["redirect_uri"],
            "com.googleusercontent.apps.123:/oauth2callback"
        );
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], "profile email");
    }

    #[test]
    fn keeps_existing_endpoint_query() {
        let client_id = GoogleClientId::new("a.b").unwrap();
        let endpoint = Url::parse("http://localhost:9000/auth?prompt=consent").unwrap();
        let url = authorization_url(&endpoint, &client_id, &pkce(), "http://127.0.0.1/cb");
        assert!(url.as_str().starts_with("http://localhost:9000/auth?prompt=consent&client_id=a.b"));
    }

    #[test]
    fn extracts_code() {
        let url = Url::parse("com.googleusercontent.apps.123://oauth2callback?code=ABC123").unwrap();
        assert_eq!(authorization_code(&url).unwrap(), "ABC123");

        let url = Url::parse("com.googleusercontent.apps.123:/oauth2callback?state=x&code=4%2F0A").unwrap();
        assert_eq!(authorization_code(&url).unwrap(), "4/0A");
    }

    #[test]
    fn missing_code_is_an_error() {
        let url = Url::parse("com.googleusercontent.apps.123://oauth2callback?foo=bar").unwrap();
        match authorization_code(&url) {
            Err(Error::UrlDidNotContainCodeParameter(u)) => assert_eq!(u, url),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn matches_callback_scheme() {
        let url = Url::parse("com.googleusercontent.apps.123:/oauth2callback?code=1").unwrap();
        assert!(is_callback_url(&url, "com.googleusercontent.apps.123"));
        assert!(!is_callback_url(&url, "https"));
    }
}
