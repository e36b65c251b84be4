use async_trait::async_trait;
use parking_lot::RwLock;

/// Source of the caller's identity, consulted once per command
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    async fn current_user(&self) -> Option<String>;
}

/// Provider returning a fixed identity that can be swapped at runtime
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user: RwLock<Option<String>>,
}

impl StaticAuthProvider {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(user.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: impl Into<String>) {
        *self.user.write() = Some(user.into());
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

#[async_trait]
impl AuthenticationProvider for StaticAuthProvider {
    async fn current_user(&self) -> Option<String> {
        self.user.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let auth = StaticAuthProvider::anonymous();
        assert_eq!(auth.current_user().await, None);

        auth.sign_in("operator-1");
        assert_eq!(auth.current_user().await.as_deref(), Some("operator-1"));

        auth.sign_out();
        assert_eq!(auth.current_user().await, None);
    }
}
