//! SES `SendRawEmail` client
//!
//! Builds a `multipart/mixed` message, wraps it in the form-encoded SES query
//! API body and posts it with SigV4 headers through an [`HttpTransport`].

use crate::signer::{encode_uri_component, AwsSigner, SignableRequest, SigningConfig, TemporaryCredentials};
use crate::{AwsResult, SesError};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use sdkd_core::{HttpRequest, HttpTransport};
use std::sync::Arc;
use uuid::Uuid;

/// Signing service name for SES
pub const SES_SERVICE: &str = "email";

/// Region SES calls go to unless configured otherwise
pub const DEFAULT_SES_REGION: &str = "us-east-1";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// File attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Plain text message with optional attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl RawEmail {
    /// Render the message as MIME using `boundary` between parts
    pub fn to_mime(&self, boundary: &str) -> Result<String, SesError> {
        check_address(&self.to)?;
        check_address(&self.from)?;
        let subject = self.subject.replace(['\r', '\n'], " ");

        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("Subject: {subject}\r\n"));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!("Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"));

        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        out.push_str(&self.body);
        out.push_str("\r\n");

        for attachment in &self.attachments {
            let filename = attachment.filename.replace(['"', '\r', '\n'], "");
            out.push_str(&format!("--{boundary}\r\n"));
            out.push_str(&format!("Content-Type: {}\r\n", attachment.content_type));
            out.push_str("Content-Transfer-Encoding: base64\r\n");
            out.push_str(&format!("Content-Disposition: attachment;filename=\"{filename}\"\r\n\r\n"));
            let encoded = general_purpose::STANDARD.encode(&attachment.data);
            for line in encoded.as_bytes().chunks(76) {
                out.push_str(&String::from_utf8_lossy(line));
                out.push_str("\r\n");
            }
        }

        out.push_str(&format!("--{boundary}--\r\n"));
        Ok(out)
    }
}

fn check_address(address: &str) -> Result<(), SesError> {
    if address.contains(['\r', '\n']) || !address.contains('@') {
        return Err(SesError::InvalidAddress(address.escape_debug().to_string()));
    }
    Ok(())
}

/// Form body for the `SendRawEmail` action
pub fn send_raw_email_body(to: &str, from: &str, mime: &str) -> String {
    let data = general_purpose::STANDARD.encode(mime.as_bytes());
    [
        ("Action", "SendRawEmail"),
        ("Source", from),
        ("Destinations.member.1", to),
        ("RawMessage.Data", data.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{key}={}", encode_uri_component(value)))
    .collect::<Vec<_>>()
    .join("&")
}

/// SES client bound to one set of credentials
#[derive(Debug, Clone)]
pub struct SesMailer {
    transport: Arc<dyn HttpTransport>,
    signer: AwsSigner,
    endpoint: String,
}

impl SesMailer {
    /// Mailer for `region` using temporary credentials
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: &TemporaryCredentials,
        region: &str,
    ) -> AwsResult<Self> {
        let config = SigningConfig::from_credentials(credentials)
            .with_region(region)
            .with_service(SES_SERVICE);

        Ok(Self {
            transport,
            signer: AwsSigner::new(config)?,
            endpoint: format!("https://email.{region}.amazonaws.com"),
        })
    }

    /// Override the endpoint URL
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Endpoint URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a message, returning the SES message id when the response carries one
    pub async fn send_raw_email(&self, email: &RawEmail) -> AwsResult<Option<String>> {
        let boundary = format!("sdkd-{}", Uuid::new_v4().simple());
        let mime = email.to_mime(&boundary)?;
        let body = send_raw_email_body(&email.to, &email.from, &mime);

        let signable = SignableRequest::new("POST", self.endpoint.clone())
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_body(body.clone());
        let signed = self.signer.sign(&signable, Utc::now())?;

        let mut request = HttpRequest::post(self.endpoint.clone(), body);
        for (name, value) in signed.to_pairs() {
            request = request.with_header(name, value);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            attachments = email.attachments.len(),
            "sending raw email"
        );
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            tracing::warn!(status = response.status, "SES rejected message");
            return Err(SesError::Rejected {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        Ok(extract_message_id(&response.body))
    }
}

fn extract_message_id(body: &str) -> Option<String> {
    let start = body.find("<MessageId>")? + "<MessageId>".len();
    let end = body[start..].find("</MessageId>")? + start;
    Some(body[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> RawEmail {
        RawEmail {
            to: "user@example.com".to_string(),
            from: "recovery@sdkd.co".to_string(),
            subject: "Your recovery key for SDKD".to_string(),
            body: "Your recovery key is abc".to_string(),
            attachments: vec![Attachment::new("recovery-code.txt", "text/plain", b"abc".to_vec())],
        }
    }

    #[test]
    fn test_mime_layout() {
        let mime = email().to_mime("BOUNDARY").unwrap();
        assert!(mime.starts_with("From: recovery@sdkd.co\r\nSubject: Your recovery key for SDKD\r\nTo: user@example.com\r\n"));
        assert!(mime.contains("Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n\r\n--BOUNDARY\r\n"));
        assert!(mime.contains("Content-Type: text/plain; charset=utf-8\r\n\r\nYour recovery key is abc\r\n"));
        assert!(mime.contains("Content-Disposition: attachment;filename=\"recovery-code.txt\"\r\n\r\nYWJj\r\n"));
        assert!(mime.ends_with("--BOUNDARY--\r\n"));
    }

    #[test]
    fn test_header_injection_rejected() {
        let mut bad = email();
        bad.to = "user@example.com\r\nBcc: evil@example.com".to_string();
        assert!(matches!(bad.to_mime("B"), Err(SesError::InvalidAddress(_))));

        let mut subject = email();
        subject.subject = "line\r\nBcc: x@y.z".to_string();
        assert!(subject.to_mime("B").unwrap().contains("Subject: line  Bcc: x@y.z\r\n"));
    }

    #[test]
    fn test_form_body_order_and_encoding() {
        let body = send_raw_email_body("user@example.com", "recovery@sdkd.co", "hi");
        assert_eq!(
            body,
            "Action=SendRawEmail&Source=recovery%40sdkd.co&Destinations.member.1=user%40example.com&RawMessage.Data=aGk%3D"
        );
    }

    #[test]
    fn test_extract_message_id() {
        let body = "<SendRawEmailResponse><SendRawEmailResult><MessageId>0100-abc</MessageId></SendRawEmailResult></SendRawEmailResponse>";
        assert_eq!(extract_message_id(body).as_deref(), Some("0100-abc"));
        assert_eq!(extract_message_id("<Error/>"), None);
    }
}
