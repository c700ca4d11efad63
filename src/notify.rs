use async_trait::async_trait;
use thiserror::Error;

/// A visitor's message from the contact page.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification failed: {0}")]
    Failed(String),
}

/// Hand-off point for contact messages, called after the form validates.
#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify(&self, message: &ContactMessage) -> Result<(), NotifyError>;
}

/// Records contact messages in the log. Nothing is delivered.
pub struct LogNotifier;

#[async_trait]
impl ContactNotifier for LogNotifier {
    async fn notify(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        tracing::info!(
            name = %message.name,
            email = %message.email,
            phone = message.phone.as_deref().unwrap_or("-"),
            "Contact message received ({} chars)",
            message.message.chars().count()
        );
        Ok(())
    }
}
