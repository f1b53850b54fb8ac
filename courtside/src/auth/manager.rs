//! Access token issue and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::errors::{AuthError, AuthResult};
use super::models::{AccessTokenClaims, Principal};

/// HS256 token codec sharing one secret
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_token_duration: Duration,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("access_token_duration", &self.access_token_duration)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_duration: Duration::minutes(15),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.access_token_duration = duration;
        self
    }

    /// Issue an access token for `principal`
    pub fn issue(&self, principal: &Principal) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: principal.user_id,
            rating: principal.rating,
            is_admin: principal.is_admin,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify an access token and return the caller it names
    pub fn verify(&self, token: &str) -> AuthResult<Principal> {
        let token_data =
            decode::<AccessTokenClaims>(token, &self.decoding, &Validation::default())?;
        Ok(token_data.claims.into())
    }

    /// Verify a token and require the admin flag
    pub fn verify_admin(&self, token: &str) -> AuthResult<Principal> {
        let principal = self.verify(token)?;
        if !principal.is_admin {
            return Err(AuthError::AdminRequired);
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new("test_secret");
        let token = verifier.issue(&Principal::player(7, 3.4)).unwrap();

        let principal = verifier.verify(&token).unwrap();
        assert_eq!(principal.user_id, 7);
        assert_eq!(principal.rating, 3.4);
        assert!(!principal.is_admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenVerifier::new("one").issue(&Principal::player(1, 2.0)).unwrap();
        let err = TokenVerifier::new("two").verify(&token).unwrap_err();
        assert_eq!(err.client_message(), "Authentication failed");
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new("secret").with_duration(Duration::minutes(-10));
        let token = verifier.issue(&Principal::player(1, 2.0)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_admin_required() {
        let verifier = TokenVerifier::new("secret");
        let player = verifier.issue(&Principal::player(1, 2.0)).unwrap();
        let admin = verifier.issue(&Principal::admin(2)).unwrap();

        assert!(matches!(
            verifier.verify_admin(&player),
            Err(AuthError::AdminRequired)
        ));
        assert!(verifier.verify_admin(&admin).unwrap().is_admin);
    }
}
