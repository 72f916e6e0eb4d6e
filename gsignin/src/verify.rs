//! Signature checks for Google ID tokens.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;
use url::Url;

use crate::error::{Error, Result};
use crate::jwt::IdToken;

pub const GOOGLE_JWKS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Verifies ID tokens against Google's published signing keys.
///
/// Keys are fetched lazily and cached; a token signed with an unknown `kid`
/// triggers one refetch to pick up key rotation.
pub struct IdTokenVerifier {
    http_client: reqwest::Client,
    jwks_endpoint: Url,
    audiences: Vec<String>,
    keys: RwLock<Option<JwkSet>>,
}

impl IdTokenVerifier {
    pub fn new(http_client: reqwest::Client, jwks_endpoint: Url, audiences: Vec<String>) -> Self {
        Self {
            http_client,
            jwks_endpoint,
            audiences,
            keys: RwLock::new(None),
        }
    }

    pub async fn verify(&self, id_token: &IdToken) -> Result<()> {
        let header = jsonwebtoken::decode_header(id_token.raw()).map_err(verification_error)?;
        if header.alg != Algorithm::RS256 {
            return Err(Error::IdTokenVerification(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| Error::IdTokenVerification("token has no key id".to_owned()))?;

        let key = match self.cached_key(&kid).await? {
            Some(key) => key,
            None => {
                self.refresh().await?;
                self.cached_key(&kid).await?.ok_or_else(|| {
                    Error::IdTokenVerification(format!("unknown signing key {kid}"))
                })?
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(self.audiences.as_slice());
        validation.set_issuer(&GOOGLE_ISSUERS[..]);

        jsonwebtoken::decode::<serde_json::Value>(id_token.raw(), &key, &validation)
            .map_err(verification_error)?;

        tracing::debug!(%kid, "ID token signature verified");
        Ok(())
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        let keys = self.keys.read().await;
        match keys.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => DecodingKey::from_jwk(jwk)
                .map(Some)
                .map_err(verification_error),
            None => Ok(None),
        }
    }

    async fn refresh(&self) -> Result<()> {
        tracing::debug!(endpoint = %self.jwks_endpoint, "fetching signing keys");

        let set = self
            .http_client
            .get(self.jwks_endpoint.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;

        tracing::debug!(keys = set.keys.len(), "signing keys refreshed");
        *self.keys.write().await = Some(set);
        Ok(())
    }
}

fn verification_error(e: jsonwebtoken::errors::Error) -> Error {
    Error::IdTokenVerification(e.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::jwt::tests::make_jwt;

    const SIGNING_KEY_PEM: &str = include_str!("testdata/rsa_key.pem");
    const SIGNING_KEY_N: &str = "q2_sh-ddxeDcbDVgKLqlS02rDIiM7KfdEiqnkMv1axrD0PKvSHC9fKIOim00X4giR1CtimNWdPPTSDBPq5_oSOp_43eXtQ4v2-QhWkS2FXzTs_UNzJfqh9CohUbYdy14ZqUVKZIix_VTHL8N4Y8HXYbUk3iJuBb3xfmj9UDNUEnbrK56LsipHcRqqP5ZWFvfLYBk2z-H9PGr_vkCCTPpNnLJ_-4V2AfEdzzYzsCFB_agGeH7kU9slpnbyngBBGiGJJkkeKbZqSFSAsGAetEuHZ1GxmiStDI6fuQIFkPTEMMFHpjFXa5qBp7DTNm9CydwlZCDk7t-Z-3i7JWhGclGIQ";
    const KID: &str = "test-key";
    const AUDIENCE: &str = "a.b";

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn signed_id_token(iss: &str, aud: &str, exp: u64) -> IdToken {
        let mut header = jsonwebtoken::Header::new(Algorithm::RS256);
        header.kid = Some(KID.to_owned());
        let claims = json!({
            "iss": iss,
            "aud": aud,
            "sub": "1234567890",
            "exp": exp,
            "iat": exp.saturating_sub(3600),
            "name": "Jane Doe",
            "email": "jane@example.com",
        });
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).unwrap();
        let encoded = jsonwebtoken::encode(&header, &claims, &key).unwrap();
        IdToken::parse(&encoded).unwrap()
    }

    async fn jwks_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "RSA",
                    "alg": "RS256",
                    "use": "sig",
                    "kid": KID,
                    "n": SIGNING_KEY_N,
                    "e": "AQAB",
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn id_token(header: serde_json::Value) -> IdToken {
        let encoded = make_jwt(&header, &json!({ "name": "J", "email": "j@x.io" }));
        IdToken::parse(&encoded).unwrap()
    }

    async fn verifier(server: &MockServer) -> IdTokenVerifier {
        let endpoint = Url::parse(&format!("{}/certs", server.uri())).unwrap();
        IdTokenVerifier::new(reqwest::Client::new(), endpoint, vec![AUDIENCE.to_owned()])
    }

    #[tokio::test]
    async fn rejects_token_without_kid() {
        let server = MockServer::start().await;
        let err = verifier(&server)
            .await
            .verify(&id_token(json!({ "alg": "RS256", "typ": "JWT" })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdTokenVerification(_)));
    }

    #[tokio::test]
    async fn rejects_unexpected_algorithm() {
        let server = MockServer::start().await;
        let err = verifier(&server)
            .await
            .verify(&id_token(json!({ "alg": "HS256", "kid": "1" })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdTokenVerification(msg) if msg.contains("HS256")));
    }

    #[tokio::test]
    async fn unknown_kid_refetches_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let err = verifier(&server)
            .await
            .verify(&id_token(json!({ "alg": "RS256", "kid": "missing" })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IdTokenVerification(msg) if msg.contains("missing")));
    }

    #[tokio::test]
    async fn jwks_fetch_failure_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = verifier(&server)
            .await
            .verify(&id_token(json!({ "alg": "RS256", "kid": "1" })))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn accepts_token_signed_by_google_key() {
        let server = jwks_server().await;
        let verifier = verifier(&server).await;

        let token = signed_id_token("https://accounts.google.com", AUDIENCE, now() + 3600);
        verifier.verify(&token).await.unwrap();

        // Served from cache.
        let token = signed_id_token("accounts.google.com", AUDIENCE, now() + 3600);
        verifier.verify(&token).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_claims() {
        let server = jwks_server().await;
        let verifier = verifier(&server).await;

        let cases = [
            (
                signed_id_token("https://accounts.google.com", "other.client", now() + 3600),
                "InvalidAudience",
            ),
            (
                signed_id_token("https://evil.example.com", AUDIENCE, now() + 3600),
                "InvalidIssuer",
            ),
            (
                signed_id_token("https://accounts.google.com", AUDIENCE, now() - 3600),
                "ExpiredSignature",
            ),
        ];

        for (token, expected) in cases {
            let err = verifier.verify(&token).await.unwrap_err();
            assert!(
                matches!(&err, Error::IdTokenVerification(msg) if msg.contains(expected)),
                "expected {expected}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn rejects_tampered_signature() {
        let server = jwks_server().await;
        let verifier = verifier(&server).await;

        let token = signed_id_token("https://accounts.google.com", AUDIENCE, now() + 3600);
        let (signed, _) = token.raw().rsplit_once('.').unwrap();
        let forged = IdToken::parse(&format!("{signed}.c2lnbmF0dXJl")).unwrap();

        let err = verifier.verify(&forged).await.unwrap_err();
        assert!(matches!(err, Error::IdTokenVerification(_)));
    }
}
