//! Email delivery of certified documents.

mod smtp;

pub use smtp::SmtpMailTransport;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{
    header::ContentType, Attachment as MailAttachment, Mailbox, MultiPart, SinglePart,
};
use lettre::{Address, Message};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit;
use crate::config::MailConfig;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::format::{sniff_format, ContentKind};
use crate::stamp::StampRenderer;
use crate::store::Store;

pub const DEFAULT_SENDER_NAME: &str = "CertiKiosk";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail transport is not configured: {0}")]
    Config(String),
    #[error("invalid address: {0}")]
    Address(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("could not compose message: {0}")]
    Compose(String),
}

impl From<DeliveryError> for AppError {
    fn from(value: DeliveryError) -> Self {
        let kind = match value {
            DeliveryError::Config(_) => ErrorKind::Config,
            DeliveryError::Address(_) => ErrorKind::Validation,
            DeliveryError::Transport(_) => ErrorKind::Delivery,
            DeliveryError::Compose(_) => ErrorKind::Encoding,
        };
        AppError::new(kind, value.to_string())
    }
}

/// Message ready for submission, with the addressing kept alongside for
/// logging.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message: Message,
}

impl ComposedMessage {
    /// RFC 5322 wire form.
    pub fn formatted(&self) -> String {
        String::from_utf8_lossy(&self.message.formatted()).into_owned()
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    async fn send(&self, message: &ComposedMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
    pub mime_type: String,
    pub stamped: bool,
}

impl Attachment {
    pub(crate) fn original(bytes: Vec<u8>, kind: ContentKind, mime_hint: Option<&str>) -> Self {
        let mime_type = mime_hint
            .map(str::trim)
            .filter(|hint| !hint.is_empty() && *hint != "application/octet-stream")
            .filter(|hint| ContentType::parse(hint).is_ok())
            .unwrap_or(kind.mime_type())
            .to_string();
        Self {
            bytes,
            kind,
            mime_type,
            stamped: false,
        }
    }

    fn stamped_pdf(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            kind: ContentKind::Pdf,
            mime_type: ContentKind::Pdf.mime_type().to_string(),
            stamped: true,
        }
    }
}

/// Stamps raster payloads, trying the stamp image first, then the text
/// stamp, then giving up and keeping the original bytes. Other payloads pass
/// through unchanged, with unrecognised content labelled as PDF.
pub async fn prepare_attachment(
    renderer: &StampRenderer,
    payload: Vec<u8>,
    stamp_image: Option<Vec<u8>>,
    document_type: &str,
    mime_hint: Option<&str>,
) -> Attachment {
    let kind = sniff_format(&payload).or_pdf();
    if !kind.is_stampable() {
        return Attachment::original(payload, kind, mime_hint);
    }

    if let Some(stamp) = stamp_image.filter(|stamp| !stamp.is_empty()) {
        match renderer
            .convert_image_to_pdf_with_image_stamp(payload.clone(), stamp, kind, document_type)
            .await
        {
            Ok(pdf) => return Attachment::stamped_pdf(pdf),
            Err(err) => warn!(error = %err, "image stamp failed, trying text stamp"),
        }
    }

    match renderer
        .convert_image_to_pdf_with_stamp(payload.clone(), kind, document_type)
        .await
    {
        Ok(pdf) => Attachment::stamped_pdf(pdf),
        Err(err) => {
            warn!(error = %err, format = kind.extension(), "text stamp failed, sending original");
            Attachment::original(payload, kind, mime_hint)
        }
    }
}

pub fn attachment_filename(document_type: &str, identifier: &str, kind: ContentKind) -> String {
    let sanitize = |value: &str| -> String {
        let cleaned: String = value
            .trim()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            "document".to_string()
        } else {
            cleaned
        }
    };
    format!(
        "{}_{}.{}",
        sanitize(document_type),
        sanitize(identifier),
        kind.extension()
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Control characters become spaces so header values stay on one line.
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

pub fn email_subject(document_type: &str) -> String {
    format!(
        "Your {} Document from {DEFAULT_SENDER_NAME}",
        single_line(document_type)
    )
}

pub fn email_body(document_type: &str, identifier: &str, kind: ContentKind) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
.container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background-color: #4CAF50; color: white; padding: 20px; text-align: center; }}
.content {{ padding: 20px; background-color: #f9f9f9; }}
.footer {{ text-align: center; padding: 20px; font-size: 12px; color: #777; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h1>{sender} Document Delivery</h1></div>
<div class="content">
<h2>Hello,</h2>
<p>Your requested document is now available. Please find your <strong>{document_type}</strong> document attached to this email.</p>
<p><strong>Document ID:</strong> {identifier}</p>
<p>The document is attached as a {label}. If you have any questions or issues accessing the document, please contact our support team.</p>
</div>
<div class="footer"><p>This is an automated email. Please do not reply to this message.</p></div>
</div>
</body>
</html>"#,
        sender = DEFAULT_SENDER_NAME,
        document_type = escape_html(document_type),
        identifier = escape_html(identifier),
        label = kind.label(),
    )
}

pub struct MessageParts<'a> {
    pub from_address: &'a str,
    pub from_name: &'a str,
    pub recipient: &'a str,
    pub subject: &'a str,
    pub html_body: &'a str,
    pub attachment: &'a Attachment,
    pub filename: &'a str,
}

/// Builds a multipart/mixed message with the HTML body and one attachment.
/// Header encoding and folding are left to `lettre`.
pub fn compose_message(parts: &MessageParts<'_>) -> Result<ComposedMessage, DeliveryError> {
    let parse = |value: &str| {
        value
            .parse::<Address>()
            .map_err(|err| DeliveryError::Address(format!("{value}: {err}")))
    };
    let from = parse(parts.from_address)?;
    let to = parse(parts.recipient)?;
    let content_type = ContentType::parse(&parts.attachment.mime_type)
        .or_else(|_| ContentType::parse(parts.attachment.kind.mime_type()))
        .map_err(|err| DeliveryError::Compose(err.to_string()))?;
    let message_id = format!("<{}@{}>", Uuid::new_v4().simple(), from.domain());
    let subject = single_line(parts.subject);

    let message = Message::builder()
        .from(Mailbox::new(Some(single_line(parts.from_name)), from.clone()))
        .to(Mailbox::new(None, to.clone()))
        .subject(subject.clone())
        .date_now()
        .message_id(Some(message_id))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(parts.html_body.to_string()))
                .singlepart(
                    MailAttachment::new(parts.filename.to_string())
                        .body(parts.attachment.bytes.clone(), content_type),
                ),
        )
        .map_err(|err| DeliveryError::Compose(err.to_string()))?;

    Ok(ComposedMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        message,
    })
}

#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub recipient: String,
    pub document_type: String,
    pub identifier: String,
    pub payload: Vec<u8>,
    pub stamp_image: Option<Vec<u8>>,
    pub mime_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub recipient: String,
    pub identifier: String,
    pub attachment_name: String,
    pub content_type: String,
    pub size: usize,
    pub stamped: bool,
}

#[derive(Clone)]
pub struct DeliveryChannel {
    store: Arc<dyn Store>,
    renderer: StampRenderer,
    mail: MailConfig,
    transport: Option<Arc<dyn MailTransport>>,
}

impl DeliveryChannel {
    pub fn new(
        store: Arc<dyn Store>,
        renderer: StampRenderer,
        mail: MailConfig,
        transport: Option<Arc<dyn MailTransport>>,
    ) -> Self {
        Self {
            store,
            renderer,
            mail,
            transport,
        }
    }

    pub fn renderer(&self) -> &StampRenderer {
        &self.renderer
    }

    /// Fails with a configuration error unless every transport setting is
    /// present and a transport was built.
    pub fn ensure_configured(&self) -> AppResult<Arc<dyn MailTransport>> {
        self.mail.validate()?;
        self.transport
            .clone()
            .ok_or_else(|| AppError::config("mail transport is not available"))
    }

    pub async fn email_document(&self, request: EmailRequest) -> AppResult<DeliveryReceipt> {
        let transport = self.ensure_configured()?;

        let recipient = request.recipient.trim().to_string();
        if recipient.is_empty() {
            return Err(AppError::validation("recipient email is required"));
        }
        recipient
            .parse::<lettre::Address>()
            .map_err(|err| AppError::validation(format!("invalid recipient email: {err}")))?;

        if request.payload.is_empty() {
            return Err(AppError::missing_input(
                "no document content could be resolved for delivery",
            ));
        }

        let document_type = if request.document_type.trim().is_empty() {
            "Document".to_string()
        } else {
            request.document_type.trim().to_string()
        };

        let attachment = prepare_attachment(
            &self.renderer,
            request.payload,
            request.stamp_image,
            &document_type,
            request.mime_hint.as_deref(),
        )
        .await;
        let filename = attachment_filename(&document_type, &request.identifier, attachment.kind);
        let subject = email_subject(&document_type);
        let html_body = email_body(&document_type, &request.identifier, attachment.kind);
        let from_address = self
            .mail
            .sender_address()
            .ok_or_else(|| AppError::config("mail sender address is not configured"))?;
        let from_name = self.mail.from_name.as_deref().unwrap_or(DEFAULT_SENDER_NAME);

        let message = compose_message(&MessageParts {
            from_address,
            from_name,
            recipient: &recipient,
            subject: &subject,
            html_body: &html_body,
            attachment: &attachment,
            filename: &filename,
        })?;

        transport.send(&message).await?;
        info!(
            recipient = %recipient,
            identifier = %request.identifier,
            attachment = %filename,
            stamped = attachment.stamped,
            "document emailed"
        );

        audit::record(
            self.store.as_ref(),
            audit::DOCUMENT_EMAILED,
            format!("Document emailed to {recipient}"),
            request.identifier.clone(),
        );

        Ok(DeliveryReceipt {
            recipient,
            identifier: request.identifier,
            attachment_name: filename,
            content_type: attachment.mime_type,
            size: attachment.bytes.len(),
            stamped: attachment.stamped,
        })
    }
}
