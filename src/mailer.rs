// Outbound mail boundary. The transactional sender is an external
// collaborator; the core only needs a send call and never retries it.

pub trait MailSender: Send + Sync {
    fn send(&self, to: &[String], subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default sink: records the send via tracing. Stands in for the host
/// platform's mailer when none is wired up.
pub struct LogMailer;

impl MailSender for LogMailer {
    fn send(&self, to: &[String], subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            recipients = ?to,
            subject,
            body_bytes = body.len(),
            "daily summary email"
        );
        Ok(())
    }
}
