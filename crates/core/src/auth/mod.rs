mod api_key;
mod none;
mod traits;

pub use api_key::ApiKeyAuthenticator;
pub use none::NoneAuthenticator;
pub use traits::{AuthError, AuthRequest, Authenticator, Identity};

use std::sync::Arc;

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Arc::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using api_key auth method".to_string(),
                    )
                })?;
            Ok(Arc::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}
