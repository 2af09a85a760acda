use crate::error::{RelayError, Result};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use serde::de::DeserializeOwned;

/// HMAC (HS256/HS384/HS512) JWT verifier for any claims type
///
/// Tokens whose header names any other algorithm, including `none` and the
/// asymmetric families, are rejected. Expiry is always validated.
#[derive(Clone)]
pub struct JwtVerifier<C> {
    decoding_key: DecodingKey,
    validation: Validation,
    _claims: std::marker::PhantomData<C>,
}

impl<C: DeserializeOwned> JwtVerifier<C> {
    /// Create a verifier using a static secret
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            _claims: std::marker::PhantomData,
        }
    }

    /// Set the expected issuer claim
    pub fn set_issuer(&mut self, issuer: impl Into<String>) {
        self.validation.set_issuer(&[issuer.into()]);
    }

    /// Verify and decode a JWT token
    pub fn verify(&self, token: &str) -> Result<TokenData<C>> {
        decode::<C>(token, &self.decoding_key, &self.validation)
            .map_err(|e| RelayError::unauthorized(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestClaims {
        sub: String,
        exp: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<String>,
    }

    fn claims(exp_offset: chrono::Duration) -> TestClaims {
        TestClaims {
            sub: "user123".to_string(),
            exp: (chrono::Utc::now() + exp_offset).timestamp() as usize,
            iss: None,
        }
    }

    #[test]
    fn test_hmac_family_accepted() {
        let secret = b"my_secret_key_for_testing_12345";
        let verifier = JwtVerifier::<TestClaims>::from_secret(secret);
        let claims = claims(chrono::Duration::hours(1));

        for alg in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let token = encode(&Header::new(alg), &claims, &EncodingKey::from_secret(secret)).unwrap();
            assert!(verifier.verify(&token).is_ok(), "{alg:?} should verify");
        }
    }

    #[test]
    fn test_algorithm_confusion_attack_rejected() {
        let secret = b"my_secret_key_for_testing_12345";
        let verifier = JwtVerifier::<TestClaims>::from_secret(secret);
        let valid_token = encode(
            &Header::new(Algorithm::HS256),
            &claims(chrono::Duration::hours(1)),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        // Same payload and signature under {"alg":"RS256","typ":"JWT"}
        let (_, rest) = valid_token.split_once('.').unwrap();
        let forged = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}", rest);

        let err = verifier.verify(&forged).unwrap_err();
        assert!(err.to_string().contains("Invalid token"));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let verifier = JwtVerifier::<TestClaims>::from_secret(b"secret");

        // {"alg":"none","typ":"JWT"} . {"sub":"user123","exp":9999999999}
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let payload = "eyJzdWIiOiJ1c2VyMTIzIiwiZXhwIjo5OTk5OTk5OTk5fQ";
        let none_token = format!("{}.{}.", none_header, payload);

        assert!(verifier.verify(&none_token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = b"secret";
        let verifier = JwtVerifier::<TestClaims>::from_secret(secret);
        let token = encode(
            &Header::default(),
            &claims(chrono::Duration::hours(-2)),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(verifier.verify(&token), Err(RelayError::Unauthorized(_))));
    }

    #[test]
    fn test_issuer_enforced_when_set() {
        let secret = b"secret";
        let mut verifier = JwtVerifier::<TestClaims>::from_secret(secret);
        verifier.set_issuer("auth.example.com");

        let mut c = claims(chrono::Duration::hours(1));
        c.iss = Some("someone-else".to_string());
        let token = encode(&Header::default(), &c, &EncodingKey::from_secret(secret)).unwrap();
        assert!(verifier.verify(&token).is_err());

        c.iss = Some("auth.example.com".to_string());
        let token = encode(&Header::default(), &c, &EncodingKey::from_secret(secret)).unwrap();
        assert!(verifier.verify(&token).is_ok());
    }
}
