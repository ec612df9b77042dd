//! API Key authentication.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that validates requests against a configured shared key.
///
/// Accepts the key in either:
/// - `X-API-Key: <key>` header (checked first)
/// - `Authorization: Bearer <key>` header
///
/// Surrounding whitespace is ignored.
pub struct ApiKeyAuthenticator {
    expected_digest: [u8; 32],
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: &str) -> Self {
        Self {
            expected_digest: digest(api_key.trim()),
        }
    }

    fn extract_key(request: &AuthRequest) -> Option<&str> {
        if let Some(key) = request.header("x-api-key").map(str::trim) {
            if !key.is_empty() {
                return Some(key);
            }
        }

        let header = request.header("authorization")?.trim();
        let (scheme, token) = header.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = Self::extract_key(request).ok_or(AuthError::MissingKey)?;

        // Fixed-length digests so the comparison time does not depend on the key
        if constant_time_eq(&digest(provided), &self.expected_digest) {
            Ok(Identity {
                subject: "api_key".to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidKey)
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
