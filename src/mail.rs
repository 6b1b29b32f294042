use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outgoing mail. Delivery failures surface to the caller; nothing retries.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, msg: MailMessage) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, msg: MailMessage) -> anyhow::Result<()> {
        info!(
            from = %msg.from,
            to = %msg.to,
            subject = %msg.subject,
            body = %msg.body,
            "mail queued"
        );
        Ok(())
    }
}

pub fn reset_email(from: &str, to: &str, reset_url: &str) -> MailMessage {
    MailMessage {
        from: from.into(),
        to: to.into(),
        subject: "Password Reset Request".into(),
        body: format!(
            "To reset your password, visit the following link:\n\
             {reset_url}\n\n\
             If you did not make this request, simply ignore this email and no changes will be made.\n"
        ),
    }
}
