//! Outgoing mail: service messages (OTP codes) and per-account relay delivery.
//!
//! Two senders live here with deliberately separate transports. [`EmailService`]
//! carries the service's own mail (verification and reset codes) over the
//! transport named in the configuration file. [`RelayMailer`] is built per
//! request from an account's decrypted SMTP credentials and delivers the
//! account's messages through their own provider.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Body, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;

use crate::{
    config::{Config, EmailTransportConfig},
    db::models::otp_challenges::OtpKind,
    errors::Error,
};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    otp_validity_minutes: u64,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                // File transport for development/testing
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            otp_validity_minutes: config.otp.validity.as_secs() / 60,
        })
    }

    /// Send a one-time code to `to_email`. The subject and body depend on the
    /// challenge kind.
    pub async fn send_otp_email(&self, to_email: &str, kind: OtpKind, code: &str) -> Result<(), Error> {
        let subject = match kind {
            OtpKind::Signup => "Verify Your Email",
            OtpKind::ForgotPassword => "Reset Your Password",
        };
        let body = self.create_otp_body(kind, code);

        self.send_email(to_email, subject, &body).await
    }

    async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = to_email.parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(())
    }

    fn create_otp_body(&self, kind: OtpKind, code: &str) -> String {
        let minutes = self.otp_validity_minutes;
        let (heading, lead, tail) = match kind {
            OtpKind::Signup => (
                "Verify Your Email",
                "Thank you for signing up! Use the OTP below to verify your email:",
                "",
            ),
            OtpKind::ForgotPassword => (
                "Password Reset Request",
                "We received a request to reset your password. Use the OTP below to proceed:",
                "<p>If you didn't request this, please ignore this email.</p>",
            ),
        };

        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>{heading}</h2>
  <p>{lead}</p>
  <div style="background-color: #f0f0f0; padding: 20px; text-align: center; border-radius: 8px; margin: 20px 0;">
    <h1 style="color: #333; letter-spacing: 5px; margin: 0;">{code}</h1>
  </div>
  <p>This OTP is valid for {minutes} minutes.</p>
  {tail}
</div>"#
        )
    }
}

/// An attachment supplied by an API caller, content base64-encoded.
#[derive(Debug, Clone)]
pub struct RelayAttachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// Envelope and content for one relayed message.
#[derive(Debug, Clone)]
pub struct RelayEnvelope {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<RelayAttachment>,
}

/// Sender built per request from an account's decrypted SMTP credentials.
pub struct RelayMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl RelayMailer {
    /// Connect parameters come from stored credentials, decrypted by the
    /// caller. Plaintext lives only as long as this value.
    pub fn connect(host: &str, port: u16, username: String, password: String, use_tls: bool) -> Result<Self, Error> {
        let builder = if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| Error::Internal {
            operation: format!("create relay transport: {e}"),
        })?
        .port(port)
        .credentials(Credentials::new(username, password));

        Ok(Self {
            transport: builder.build(),
        })
    }

    /// Deliver one message, returning the Message-ID it was sent with.
    pub async fn send(&self, envelope: &RelayEnvelope) -> Result<String, Error> {
        let from = envelope.from.parse::<Mailbox>().map_err(|e| Error::BadRequest {
            message: format!("Invalid from address: {e}"),
        })?;
        let to = envelope.to.parse::<Mailbox>().map_err(|e| Error::BadRequest {
            message: format!("Invalid to address: {e}"),
        })?;

        let message_id = format!("<{}@mailship>", uuid::Uuid::new_v4());

        let body = build_body(envelope)?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&envelope.subject)
            .message_id(Some(message_id.clone()));

        let message = match body {
            MessageBody::Single(part) => message.singlepart(part),
            MessageBody::Multi(parts) => message.multipart(parts),
        }
        .map_err(|e| Error::Internal {
            operation: format!("build relay message: {e}"),
        })?;

        self.transport.send(message).await.map_err(|e| Error::Internal {
            operation: format!("relay message delivery: {e}"),
        })?;

        Ok(message_id)
    }
}

#[derive(Debug)]
enum MessageBody {
    Single(SinglePart),
    Multi(MultiPart),
}

/// Assemble the MIME body from optional text, html, and attachments.
fn build_body(envelope: &RelayEnvelope) -> Result<MessageBody, Error> {
    let content = match (&envelope.text, &envelope.html) {
        (Some(text), Some(html)) => MessageBody::Multi(MultiPart::alternative_plain_html(text.clone(), html.clone())),
        (Some(text), None) => MessageBody::Single(SinglePart::plain(text.clone())),
        (None, Some(html)) => MessageBody::Single(SinglePart::html(html.clone())),
        (None, None) => {
            return Err(Error::BadRequest {
                message: "Either text or html content is required".to_string(),
            });
        }
    };

    if envelope.attachments.is_empty() {
        return Ok(content);
    }

    let mut mixed = match content {
        MessageBody::Single(part) => MultiPart::mixed().singlepart(part),
        MessageBody::Multi(parts) => MultiPart::mixed().multipart(parts),
    };

    for attachment in &envelope.attachments {
        let content_type = match attachment.content_type.as_deref() {
            Some(raw) => ContentType::parse(raw).map_err(|e| Error::BadRequest {
                message: format!("Invalid attachment content type '{raw}': {e}"),
            })?,
            None => ContentType::parse("application/octet-stream").map_err(|e| Error::Internal {
                operation: format!("parse fallback content type: {e}"),
            })?,
        };

        let part = Attachment::new(attachment.filename.clone()).body(Body::new(attachment.content.clone()), content_type);
        mixed = mixed.singlepart(part);
    }

    Ok(MessageBody::Multi(mixed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailTransportConfig;

    fn file_transport_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.email.transport = EmailTransportConfig::File {
            path: dir.to_string_lossy().into_owned(),
        };
        config
    }

    #[tokio::test]
    async fn test_email_service_creation() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_transport_config(dir.path());
        assert!(EmailService::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_signup_otp_body() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_transport_config(dir.path())).unwrap();

        let body = service.create_otp_body(OtpKind::Signup, "0427");

        assert!(body.contains("Verify Your Email"));
        assert!(body.contains("0427"));
        assert!(body.contains("valid for 10 minutes"));
        assert!(!body.contains("ignore this email"));
    }

    #[tokio::test]
    async fn test_forgot_password_otp_body() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_transport_config(dir.path())).unwrap();

        let body = service.create_otp_body(OtpKind::ForgotPassword, "9001");

        assert!(body.contains("Password Reset Request"));
        assert!(body.contains("9001"));
        assert!(body.contains("ignore this email"));
    }

    #[tokio::test]
    async fn test_otp_email_written_to_file_transport() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_transport_config(dir.path())).unwrap();

        service
            .send_otp_email("someone@example.com", OtpKind::Signup, "1234")
            .await
            .unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn test_body_requires_text_or_html() {
        let envelope = RelayEnvelope {
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            subject: "empty".to_string(),
            text: None,
            html: None,
            attachments: vec![],
        };

        let result = build_body(&envelope);
        assert!(matches!(result.unwrap_err(), Error::BadRequest { .. }));
    }

    #[test]
    fn test_body_with_attachments_is_mixed() {
        let envelope = RelayEnvelope {
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            subject: "report".to_string(),
            text: Some("see attached".to_string()),
            html: None,
            attachments: vec![RelayAttachment {
                filename: "report.csv".to_string(),
                content: b"a,b\n1,2\n".to_vec(),
                content_type: Some("text/csv".to_string()),
            }],
        };

        assert!(matches!(build_body(&envelope).unwrap(), MessageBody::Multi(_)));
    }

    #[test]
    fn test_body_rejects_bad_content_type() {
        let envelope = RelayEnvelope {
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            subject: "report".to_string(),
            text: Some("see attached".to_string()),
            html: None,
            attachments: vec![RelayAttachment {
                filename: "report.bin".to_string(),
                content: vec![0u8; 4],
                content_type: Some("not a mime type".to_string()),
            }],
        };

        assert!(matches!(build_body(&envelope).unwrap_err(), Error::BadRequest { .. }));
    }
}
