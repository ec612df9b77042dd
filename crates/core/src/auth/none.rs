use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that lets every request through as anonymous.
/// Must be explicitly configured with `method = "none"`.
#[derive(Debug, Default)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_request_without_key() {
        let identity = NoneAuthenticator
            .authenticate(&AuthRequest::new())
            .await
            .unwrap();
        assert_eq!(identity, Identity::anonymous());
    }
}
