//! JWT Authentication Integration Tests
//!
//! Covers authenticator construction from configuration and claim checks
//! through the public API.

use jsonwebtoken::{encode, EncodingKey, Header};
use tubely::auth::jwt::{Claims, JwtAuthenticator};
use tubely::auth::{AuthError, AuthRequest, Authenticator};
use tubely::config::JwtConfig;
use uuid::Uuid;

// ========================================================================
// Helpers
// ========================================================================

fn create_hs256_token(secret: &str, claims: &Claims) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn valid_claims(user_id: Uuid) -> Claims {
    Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        iat: Some(chrono::Utc::now().timestamp() as usize),
        iss: None,
    }
}

fn jwt_config(secret: &str, algorithm: &str, issuer: Option<&str>) -> JwtConfig {
    JwtConfig {
        secret: secret.to_string(),
        algorithm: algorithm.to_string(),
        issuer: issuer.map(str::to_string),
    }
}

// ========================================================================
// Construction
// ========================================================================

#[tokio::test]
async fn test_from_config_hs256() {
    let auth = JwtAuthenticator::from_config(&jwt_config("s3cret", "hs256", None)).unwrap();
    let user_id = Uuid::new_v4();
    let token = create_hs256_token("s3cret", &valid_claims(user_id));

    let result = auth
        .authenticate(&AuthRequest::with_bearer(&token))
        .await
        .unwrap();
    assert_eq!(result.user_id, user_id);
}

#[test]
fn test_from_config_rejects_unknown_algorithm() {
    let result = JwtAuthenticator::from_config(&jwt_config("s3cret", "none", None));
    assert!(matches!(result, Err(AuthError::InvalidKey(_))));
}

#[test]
fn test_rs256_requires_pem_key() {
    let result = JwtAuthenticator::from_config(&jwt_config("not-a-pem", "RS256", None));
    assert!(matches!(result, Err(AuthError::InvalidKey(_))));
}

// ========================================================================
// Claims
// ========================================================================

#[tokio::test]
async fn test_issuer_validation() {
    let secret = "test-secret";
    let auth = JwtAuthenticator::from_config(&jwt_config(secret, "HS256", Some("tubely-access")))
        .unwrap();

    let user_id = Uuid::new_v4();
    let mut claims = valid_claims(user_id);
    claims.iss = Some("wrong-issuer".to_string());
    let token = create_hs256_token(secret, &claims);

    let result = auth.authenticate(&AuthRequest::with_bearer(&token)).await;
    assert!(
        matches!(result, Err(AuthError::InvalidToken(_))),
        "Token with wrong issuer should be rejected"
    );

    claims.iss = Some("tubely-access".to_string());
    let token = create_hs256_token(secret, &claims);
    let result = auth
        .authenticate(&AuthRequest::with_bearer(&token))
        .await
        .unwrap();
    assert_eq!(result.user_id, user_id);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_missing_auth() {
    let auth = JwtAuthenticator::new_hs256("test-secret");
    let mut request = AuthRequest::default();
    request
        .headers
        .insert("authorization".into(), "Basic dXNlcjpwYXNz".into());

    let result = auth.authenticate(&request).await;
    assert!(matches!(result, Err(AuthError::MissingAuth)));
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let auth = JwtAuthenticator::new_hs256("test-secret");

    let result = auth
        .authenticate(&AuthRequest::with_bearer("not.a.jwt"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidToken(_))));
}
