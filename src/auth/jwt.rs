//! JWT Authentication
//!
//! Supports HS256, RS256 and ES256. The `sub` claim carries the user id.

use super::{AuthError, AuthRequest, AuthResult, Authenticator};
use crate::config::JwtConfig;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub iss: Option<String>,
}

/// JWT Authenticator
///
/// # Example
///
/// ```
/// use tubely::auth::jwt::JwtAuthenticator;
///
/// // HS256 with secret
/// let auth = JwtAuthenticator::new_hs256("my-secret");
///
/// // With issuer validation
/// let auth = JwtAuthenticator::new_hs256("my-secret").with_issuer("tubely-access");
/// ```
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with a secret key (HS256)
    pub fn new_hs256(secret: &str) -> Self {
        Self::with_key(
            DecodingKey::from_secret(secret.as_bytes()),
            Algorithm::HS256,
        )
    }

    /// Create a new JWT authenticator with an RSA public key (RS256)
    pub fn new_rs256(public_key_pem: &str) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self::with_key(decoding_key, Algorithm::RS256))
    }

    /// Create a new JWT authenticator with an EC public key (ES256)
    pub fn new_es256(public_key_pem: &str) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_ec_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self::with_key(decoding_key, Algorithm::ES256))
    }

    /// Build an authenticator from configuration
    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        let authenticator = match config.algorithm.to_uppercase().as_str() {
            "HS256" => Self::new_hs256(&config.secret),
            "RS256" => Self::new_rs256(&config.secret)?,
            "ES256" => Self::new_es256(&config.secret)?,
            alg => {
                return Err(AuthError::InvalidKey(format!(
                    "unsupported algorithm {}",
                    alg
                )))
            }
        };

        Ok(match &config.issuer {
            Some(issuer) => authenticator.with_issuer(issuer),
            None => authenticator,
        })
    }

    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Set the required issuer (`iss` claim)
    ///
    /// Tokens without this issuer will be rejected.
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    #[tracing::instrument(
        name = "auth.jwt",
        skip(self, request),
        fields(auth.token_present = request.bearer_token().is_some()),
        err
    )]
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
        let token = request.bearer_token().ok_or(AuthError::MissingAuth)?;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e
                .kind()
            {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".into()))?;

        tracing::debug!(
            user.id = %user_id,
            issuer = token_data.claims.iss.as_deref().unwrap_or_default(),
            "JWT authentication successful"
        );

        Ok(AuthResult { user_id })
    }
}
