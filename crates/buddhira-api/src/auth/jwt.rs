//! Token verification for the Buddhira API.
//!
//! Validates incoming bearer tokens against the provider's published keys.
//! One verification call is fully independent of any other: parse header,
//! resolve key, check signature and claims, classify the outcome.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only ES256 (P-256) is accepted; a token declaring any other algorithm
//!   is rejected before signature verification (no algorithm confusion)
//! - `exp` and `aud` are always validated; `iss` when configured
//! - Error detail is logged server-side; clients see classified generics

use crate::auth::claims::{Claims, Principal};
use crate::auth::jwks::{Jwk, JwksClient};
use crate::auth::AuthError;
use common::jwt::extract_kid;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Verifies bearer tokens end-to-end and produces a [`Principal`].
pub struct TokenVerifier {
    /// Key resolver for the provider's key set.
    jwks: Arc<JwksClient>,

    /// Expected `aud` claim.
    audience: String,

    /// Expected `iss` claim; only validated when set.
    issuer: Option<String>,
}

impl TokenVerifier {
    /// Create a new verifier.
    #[must_use]
    pub fn new(jwks: Arc<JwksClient>, audience: String, issuer: Option<String>) -> Self {
        Self {
            jwks,
            audience,
            issuer,
        }
    }

    /// Verify one bearer token.
    ///
    /// Steps: extract `kid` from the header (size-checked), resolve the
    /// signing key, verify signature plus `exp`/`aud` (and `iss` when
    /// configured), then require a non-empty `sub`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AuthError`]; see the module documentation for
    /// the taxonomy.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "buddhira.auth.jwt", error = ?e, "Token kid extraction failed");
            AuthError::from(e)
        })?;

        let jwk = self.jwks.get_key(&kid).await?;

        let claims = verify_signed_claims(token, &jwk, &self.audience, self.issuer.as_deref())?;

        let user_id = match claims.sub.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => sub.to_string(),
            None => {
                tracing::debug!(
                    target: "buddhira.auth.jwt",
                    "Token verified but subject claim is absent or empty"
                );
                return Err(AuthError::MissingSubject);
            }
        };

        tracing::debug!(target: "buddhira.auth.jwt", "Token validated successfully");
        Ok(Principal {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Verify the token signature and standard claims against one JWK.
fn verify_signed_claims(
    token: &str,
    jwk: &Jwk,
    audience: &str,
    issuer: Option<&str>,
) -> Result<Claims, AuthError> {
    // The resolved key must belong to the one algorithm family we accept.
    // A key set entry outside that family is a rejection, not a skip.
    if jwk.kty != "EC" {
        tracing::warn!(target: "buddhira.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::InvalidToken);
    }
    if jwk.crv.as_deref() != Some("P-256") {
        tracing::warn!(
            target: "buddhira.auth.jwt",
            crv = jwk.crv.as_deref().unwrap_or("<missing>"),
            "Unexpected JWK curve"
        );
        return Err(AuthError::InvalidToken);
    }
    if let Some(alg) = &jwk.alg {
        if alg != "ES256" {
            tracing::warn!(target: "buddhira.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(AuthError::InvalidToken);
        }
    }

    let (Some(x), Some(y)) = (jwk.x.as_ref(), jwk.y.as_ref()) else {
        tracing::error!(
            target: "buddhira.auth.jwt",
            kid = %jwk.kid,
            "JWK missing public key coordinates"
        );
        return Err(AuthError::InvalidToken);
    };

    let decoding_key = DecodingKey::from_ec_components(x, y).map_err(|e| {
        tracing::error!(target: "buddhira.auth.jwt", error = %e, "Invalid public key encoding");
        AuthError::InvalidToken
    })?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_audience(&[audience]);
    if let Some(iss) = issuer {
        validation.set_issuer(&[iss]);
    }

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "buddhira.auth.jwt", error = %e, "Token verification failed");
        classify_decode_error(&e)
    })?;

    Ok(token_data.claims)
}

/// Map a `jsonwebtoken` failure onto the closed error taxonomy.
///
/// Anything not recognizably caused by the presented token goes to
/// `Internal` so bugs on our side are not reported as client auth failures.
fn classify_decode_error(e: &jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::InvalidToken,
        _ => AuthError::Internal(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Test P-256 keypair for signing tokens.
    struct TestKeypair {
        kid: String,
        pkcs8: Vec<u8>,
        x: String,
        y: String,
    }

    impl TestKeypair {
        fn new(kid: &str) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
                .expect("generate keypair");
            let key_pair =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                    .expect("parse keypair");

            // Uncompressed SEC1 point: 0x04 || x (32 bytes) || y (32 bytes)
            let point = key_pair.public_key().as_ref();
            assert_eq!(point.len(), 65);
            let x = URL_SAFE_NO_PAD.encode(&point[1..33]);
            let y = URL_SAFE_NO_PAD.encode(&point[33..65]);

            Self {
                kid: kid.to_string(),
                pkcs8: pkcs8.as_ref().to_vec(),
                x,
                y,
            }
        }

        fn sign(&self, claims: &serde_json::Value) -> String {
            let mut header = Header::new(Algorithm::ES256);
            header.typ = Some("JWT".to_string());
            header.kid = Some(self.kid.clone());
            encode(&header, claims, &EncodingKey::from_ec_der(&self.pkcs8))
                .expect("sign token")
        }

        fn jwk(&self) -> Jwk {
            Jwk {
                kty: "EC".to_string(),
                kid: self.kid.clone(),
                crv: Some("P-256".to_string()),
                x: Some(self.x.clone()),
                y: Some(self.y.clone()),
                alg: Some("ES256".to_string()),
                key_use: Some("sig".to_string()),
            }
        }

        fn jwk_json(&self) -> serde_json::Value {
            serde_json::json!({
                "kty": "EC",
                "kid": self.kid,
                "crv": "P-256",
                "x": self.x,
                "y": self.y,
                "alg": "ES256",
                "use": "sig"
            })
        }
    }

    fn claims_for(sub: Option<&str>, exp_offset: i64) -> serde_json::Value {
        let now = chrono::Utc::now().timestamp();
        let mut claims = serde_json::json!({
            "exp": now + exp_offset,
            "aud": "authenticated",
            "email": "alice@example.com",
            "role": "authenticated"
        });
        if let Some(sub) = sub {
            claims["sub"] = serde_json::json!(sub);
        }
        claims
    }

    async fn verifier_for(keypair: &TestKeypair, issuer: Option<String>) -> (MockServer, TokenVerifier) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"keys": [keypair.jwk_json()]})),
            )
            .mount(&server)
            .await;

        let jwks = Arc::new(JwksClient::with_ttl(
            Some(format!("{}/jwks.json", server.uri())),
            None,
            Duration::from_secs(3600),
        ));
        let verifier = TokenVerifier::new(jwks, "authenticated".to_string(), issuer);
        (server, verifier)
    }

    // -------------------------------------------------------------------------
    // End-to-end verification
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_valid_token_yields_principal() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let token = keypair.sign(&claims_for(Some("user-42"), 3600));
        let principal = verifier.verify(&token).await.unwrap();

        assert_eq!(principal.user_id, "user-42");
        assert_eq!(principal.email.as_deref(), Some("alice@example.com"));
        assert_eq!(principal.role.as_deref(), Some("authenticated"));
    }

    #[tokio::test]
    async fn test_expired_token_is_classified_expired() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let token = keypair.sign(&claims_for(Some("user-42"), -3600));
        let result = verifier.verify(&token).await;

        assert_eq!(result.unwrap_err(), AuthError::Expired);
    }

    #[tokio::test]
    async fn test_wrong_audience_is_invalid_token() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let now = chrono::Utc::now().timestamp();
        let token = keypair.sign(&serde_json::json!({
            "sub": "user-42",
            "exp": now + 3600,
            "aud": "something-else"
        }));
        let result = verifier.verify(&token).await;

        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn test_missing_subject_is_distinct_failure() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let token = keypair.sign(&claims_for(None, 3600));
        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::MissingSubject
        );

        let token = keypair.sign(&claims_for(Some(""), 3600));
        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::MissingSubject
        );
    }

    #[tokio::test]
    async fn test_tampered_payload_is_invalid_token() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let token = keypair.sign(&claims_for(Some("user-42"), 3600));

        // Swap the payload for one claiming a different subject, keeping
        // the original signature.
        let parts: Vec<&str> = token.split('.').collect();
        let now = chrono::Utc::now().timestamp();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "attacker",
                "exp": now + 3600,
                "aud": "authenticated"
            })
            .to_string(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            verifier.verify(&forged).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_issuer_validated_when_configured() {
        let keypair = TestKeypair::new("k1");
        let issuer = "https://example.supabase.co/auth/v1".to_string();
        let (_server, verifier) = verifier_for(&keypair, Some(issuer.clone())).await;

        let now = chrono::Utc::now().timestamp();

        let token = keypair.sign(&serde_json::json!({
            "sub": "user-42",
            "exp": now + 3600,
            "aud": "authenticated",
            "iss": issuer
        }));
        assert!(verifier.verify(&token).await.is_ok());

        let token = keypair.sign(&serde_json::json!({
            "sub": "user-42",
            "exp": now + 3600,
            "aud": "authenticated",
            "iss": "https://evil.example.com"
        }));
        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_resolution_failure() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let other = TestKeypair::new("k2");
        let token = other.sign(&claims_for(Some("user-42"), 3600));

        // The mocked key set stays fresh and never contains k2.
        assert!(matches!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::KeyResolution(_)
        ));
    }

    #[tokio::test]
    async fn test_token_without_exp_is_invalid() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let token = keypair.sign(&serde_json::json!({
            "sub": "user-42",
            "aud": "authenticated"
        }));
        assert_eq!(
            verifier.verify(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_oversized_token_rejected_before_parsing() {
        let keypair = TestKeypair::new("k1");
        let (_server, verifier) = verifier_for(&keypair, None).await;

        let oversized = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            verifier.verify(&oversized).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    // -------------------------------------------------------------------------
    // JWK family checks
    // -------------------------------------------------------------------------

    #[test]
    fn test_rejects_non_ec_key_type() {
        let keypair = TestKeypair::new("k1");
        let token = keypair.sign(&claims_for(Some("u"), 3600));

        let mut jwk = keypair.jwk();
        jwk.kty = "RSA".to_string();

        let result = verify_signed_claims(&token, &jwk, "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_rejects_wrong_curve() {
        let keypair = TestKeypair::new("k1");
        let token = keypair.sign(&claims_for(Some("u"), 3600));

        let mut jwk = keypair.jwk();
        jwk.crv = Some("P-384".to_string());

        let result = verify_signed_claims(&token, &jwk, "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_rejects_mismatched_jwk_algorithm() {
        let keypair = TestKeypair::new("k1");
        let token = keypair.sign(&claims_for(Some("u"), 3600));

        let mut jwk = keypair.jwk();
        jwk.alg = Some("RS256".to_string());

        let result = verify_signed_claims(&token, &jwk, "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_rejects_jwk_missing_coordinates() {
        let keypair = TestKeypair::new("k1");
        let token = keypair.sign(&claims_for(Some("u"), 3600));

        let mut jwk = keypair.jwk();
        jwk.y = None;

        let result = verify_signed_claims(&token, &jwk, "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_rejects_hs256_token_against_ec_key() {
        let keypair = TestKeypair::new("k1");

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "attacker",
            "exp": now + 3600,
            "aud": "authenticated"
        });
        // Attacker signs with HMAC, hoping the public key is used as the
        // shared secret.
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("k1".to_string());
        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(b"public-key-as-secret"),
        )
        .unwrap();

        let result = verify_signed_claims(&token, &keypair.jwk(), "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_rejects_alg_none_token() {
        let keypair = TestKeypair::new("k1");

        let now = chrono::Utc::now().timestamp();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT","kid":"k1"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"sub": "attacker", "exp": now + 3600, "aud": "authenticated"})
                .to_string(),
        );
        let token = format!("{header}.{payload}.");

        let result = verify_signed_claims(&token, &keypair.jwk(), "authenticated", None);
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }
}
