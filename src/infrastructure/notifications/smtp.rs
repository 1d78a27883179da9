//! SMTP delivery over STARTTLS.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info, warn};

use crate::application::ports::{Notifier, NotifierFactory, SmtpSettings};
use crate::domain::Period;
use crate::shared::errors::NotifyError;

pub const SENT_MESSAGE: &str = "Email sent successfully";
pub const CONNECTED_MESSAGE: &str = "SMTP connection successful";

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A PDF to attach, already read from disk.
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn success_subject(period: &Period) -> String {
    format!(
        "Expense report generated - {} to {}",
        period.start, period.end
    )
}

pub fn error_subject(period: &Period) -> String {
    format!("Automation error - {} to {}", period.start, period.end)
}

pub const TEST_SUBJECT: &str = "Notification test - Recharge";

fn success_body(period: &Period, executed_at: NaiveDateTime) -> String {
    format!(
        "Hello,\n\n\
         The monthly expense report for {start} to {end} was generated successfully.\n\n\
         Run details:\n\
         - Executed at: {at}\n\
         - Period covered: {start} to {end}\n\
         - Status: success\n\n\
         The report is attached to this message.\n\n\
         ---\n\
         This is an automated message from the Recharge service.\n",
        start = period.start,
        end = period.end,
        at = executed_at.format("%d/%m/%Y %H:%M"),
    )
}

fn error_body(period: &Period, detail: &str, executed_at: NaiveDateTime) -> String {
    format!(
        "Hello,\n\n\
         The automatic generation of the expense report failed.\n\n\
         Error details:\n\
         - Executed at: {at}\n\
         - Period concerned: {start} to {end}\n\
         - Status: failed\n\n\
         Error message:\n\
         {detail}\n\n\
         Suggested actions:\n\
         1. Check the provider and SMTP settings\n\
         2. Look at the service logs\n\
         3. Generate the report manually if needed\n\n\
         ---\n\
         This is an automated message from the Recharge service.\n",
        start = period.start,
        end = period.end,
        at = executed_at.format("%d/%m/%Y %H:%M"),
    )
}

const TEST_BODY: &str = "Hello,\n\n\
This is a test message to check the notification settings.\n\n\
If you received it, the SMTP server is reachable, the credentials are valid \
and outgoing mail works.\n\n\
---\n\
This is a test message.\n";

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse()
        .map_err(|e| NotifyError::Other(format!("invalid address '{}': {}", address, e)))
}

/// Assemble a plain-text message, with the PDF as a second part if given.
pub fn compose(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: String,
    attachment: Option<PdfAttachment>,
) -> Result<Message, NotifyError> {
    let builder = Message::builder()
        .from(from.clone())
        .to(mailbox(to)?)
        .subject(subject);

    let message = match attachment {
        Some(pdf) => {
            let content_type = ContentType::parse("application/pdf")
                .map_err(|e| NotifyError::Other(e.to_string()))?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(Attachment::new(pdf.filename).body(pdf.bytes, content_type)),
            )
        }
        None => builder.header(ContentType::TEXT_PLAIN).body(body),
    };
    message.map_err(|e| NotifyError::Other(e.to_string()))
}

fn classify(error: lettre::transport::smtp::Error) -> NotifyError {
    let auth = error
        .status()
        .map(|code| code.to_string().starts_with("53"))
        .unwrap_or(false);
    if auth {
        NotifyError::Authentication
    } else {
        NotifyError::Transport(error.to_string())
    }
}

/// Read the attachment if present. Missing or unreadable files are skipped.
async fn load_attachment(path: Option<&Path>) -> Option<PdfAttachment> {
    let path = path?;
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(PdfAttachment {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report.pdf".to_string()),
            bytes,
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Attachment not readable, sending without it");
            None
        }
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    server: String,
}

impl SmtpNotifier {
    /// The sender address is the SMTP login.
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let from = mailbox(&settings.user)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            .map_err(|e| {
                NotifyError::Transport(format!("invalid SMTP relay '{}': {}", settings.server, e))
            })?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            server: settings.server.clone(),
        })
    }

    async fn deliver(&self, message: Message) -> Result<String, NotifyError> {
        match self.transport.send(message).await {
            Ok(_) => Ok(SENT_MESSAGE.to_string()),
            Err(e) => {
                let err = classify(e);
                error!(server = %self.server, error = %err, "❌ Email delivery failed");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn test_connection(&self) -> Result<String, NotifyError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                info!(server = %self.server, "✅ SMTP connection verified");
                Ok(CONNECTED_MESSAGE.to_string())
            }
            Ok(false) => Err(NotifyError::Transport("server did not answer".into())),
            Err(e) => Err(classify(e)),
        }
    }

    async fn send_test_message(&self, to: &str) -> Result<String, NotifyError> {
        let message = compose(&self.from, to, TEST_SUBJECT, TEST_BODY.to_string(), None)?;
        self.deliver(message).await
    }

    async fn send_success(
        &self,
        to: &str,
        period: &Period,
        attachment: Option<&Path>,
    ) -> Result<String, NotifyError> {
        let pdf = load_attachment(attachment).await;
        debug!(to, attached = pdf.is_some(), "📧 Sending report notification");
        let message = compose(
            &self.from,
            to,
            &success_subject(period),
            success_body(period, Local::now().naive_local()),
            pdf,
        )?;
        self.deliver(message).await
    }

    async fn send_error(
        &self,
        to: &str,
        period: &Period,
        detail: &str,
    ) -> Result<String, NotifyError> {
        let message = compose(
            &self.from,
            to,
            &error_subject(period),
            error_body(period, detail, Local::now().naive_local()),
            None,
        )?;
        self.deliver(message).await
    }
}

pub struct SmtpNotifierFactory;

impl NotifierFactory for SmtpNotifierFactory {
    fn create(&self, settings: &SmtpSettings) -> Result<Arc<dyn Notifier>, NotifyError> {
        Ok(Arc::new(SmtpNotifier::new(settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn march() -> Period {
        Period::month_of(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn sender() -> Mailbox {
        mailbox("bot@example.com").unwrap()
    }

    fn rendered(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn subjects_name_the_period() {
        assert_eq!(
            success_subject(&march()),
            "Expense report generated - 2025-03-01 to 2025-03-31"
        );
        assert_eq!(
            error_subject(&march()),
            "Automation error - 2025-03-01 to 2025-03-31"
        );
    }

    #[test]
    fn success_message_carries_pdf() {
        let message = compose(
            &sender(),
            "owner@example.com",
            &success_subject(&march()),
            success_body(&march(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap().and_hms_opt(23, 59, 0).unwrap()),
            Some(PdfAttachment {
                filename: "expense_report_2025-03-01_2025-03-31.pdf".into(),
                bytes: b"%PDF-1.4".to_vec(),
            }),
        )
        .unwrap();

        let raw = rendered(&message);
        assert!(raw.contains("Subject: Expense report generated - 2025-03-01 to 2025-03-31"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("expense_report_2025-03-01_2025-03-31.pdf"));
        assert!(raw.contains("31/03/2025 23:59"));
    }

    #[test]
    fn error_message_includes_detail_without_attachment() {
        let message = compose(
            &sender(),
            "owner@example.com",
            &error_subject(&march()),
            error_body(&march(), "Incomplete SMTP settings", Local::now().naive_local()),
            None,
        )
        .unwrap();

        let raw = rendered(&message);
        assert!(raw.contains("Incomplete SMTP settings"));
        assert!(!raw.contains("application/pdf"));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let err = compose(&sender(), "not an address", TEST_SUBJECT, TEST_BODY.into(), None)
            .unwrap_err();
        assert!(matches!(err, NotifyError::Other(_)));
    }

    #[tokio::test]
    async fn missing_attachment_is_skipped() {
        assert!(load_attachment(Some(Path::new("/nonexistent/report.pdf"))).await.is_none());
        assert!(load_attachment(None).await.is_none());
    }

    #[test]
    fn factory_rejects_unusable_sender() {
        let settings = SmtpSettings {
            server: "smtp.example.com".into(),
            port: 587,
            user: "not-an-address".into(),
            password: "pw".into(),
        };
        assert!(SmtpNotifierFactory.create(&settings).is_err());
    }
}
