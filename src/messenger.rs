//! Out-of-band delivery of confirmation codes and refresh hashes.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig, errors::AppError, models::confirmation_code::ConfirmationCode,
};

const MSG_END: &str = "This message was generated automatically, please do not reply to it.";

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_confirmation_code(&self, mail: &str, code: ConfirmationCode) -> Result<(), AppError>;

    async fn send_refresh_hash(&self, mail: &str, token_hash: &str) -> Result<(), AppError>;
}

fn code_letter(code: ConfirmationCode) -> (&'static str, String) {
    (
        "Your confirmation code",
        format!(
            "Confirmation code for receiving a new access token:<br>\n<h3>{code}</h3>\n\
             If you did not request the code, ignore this message.<br>\n{MSG_END}\n"
        ),
    )
}

fn hash_letter(token_hash: &str) -> (&'static str, String) {
    (
        "Your access token",
        format!(
            "Access token:<br>\n<h3>{token_hash}</h3>\n\
             If you did not request the token, ignore this message.<br>\n{MSG_END}\n"
        ),
    )
}

pub struct SmtpMessenger {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMessenger {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, AppError> {
        let from: Mailbox = cfg
            .from
            .parse()
            .map_err(|e| AppError::Internal(format!("invalid SMTP_FROM: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .map_err(|e| AppError::Internal(format!("smtp relay: {e}")))?
            .port(cfg.port);

        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Delivery(format!("invalid recipient: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for SmtpMessenger {
    async fn send_confirmation_code(&self, mail: &str, code: ConfirmationCode) -> Result<(), AppError> {
        let (subject, body) = code_letter(code);
        self.send(mail, subject, body).await
    }

    async fn send_refresh_hash(&self, mail: &str, token_hash: &str) -> Result<(), AppError> {
        let (subject, body) = hash_letter(token_hash);
        self.send(mail, subject, body).await
    }
}

/// Writes letters to the log instead of sending them. Development only:
/// the log then holds live credentials.
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send_confirmation_code(&self, mail: &str, code: ConfirmationCode) -> Result<(), AppError> {
        let (subject, body) = code_letter(code);
        tracing::info!(to = mail, subject, body = %body, "mail not sent (no SMTP configured)");
        Ok(())
    }

    async fn send_refresh_hash(&self, mail: &str, token_hash: &str) -> Result<(), AppError> {
        let (subject, body) = hash_letter(token_hash);
        tracing::info!(to = mail, subject, body = %body, "mail not sent (no SMTP configured)");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Code(String, ConfirmationCode),
        Hash(String, String),
    }

    /// Remembers every letter instead of sending it.
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<Sent>>,
    }

    impl RecordingMessenger {
        pub fn last(&self) -> Option<Sent> {
            self.sent.lock().last().cloned()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_confirmation_code(&self, mail: &str, code: ConfirmationCode) -> Result<(), AppError> {
            self.sent.lock().push(Sent::Code(mail.to_string(), code));
            Ok(())
        }

        async fn send_refresh_hash(&self, mail: &str, token_hash: &str) -> Result<(), AppError> {
            self.sent
                .lock()
                .push(Sent::Hash(mail.to_string(), token_hash.to_string()));
            Ok(())
        }
    }
}
