//! Outbound notifications.
//!
//! Messages are composed from Askama templates (plain text + HTML) into an
//! [`OutboundEmail`] and handed to a [`Notifier`]. Production uses
//! [`SmtpNotifier`] over a STARTTLS relay; tests use [`RecordingNotifier`].
//! A notifier is built once at startup and shared through the app state.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use parlour_core::{Email, Price};

use crate::config::EmailConfig;
use crate::models::Appointment;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid attachment content type.
    #[error("Invalid content type: {0}")]
    ContentType(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The relay refused or dropped the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A file attached to an email.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A fully composed message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachment: Option<Attachment>,
}

/// Delivers composed messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the message cannot be built or delivered.
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError>;
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/booking_confirmation.html")]
struct BookingConfirmationHtml<'a> {
    business_name: &'a str,
    name: &'a str,
    booking_id: i32,
    date: &'a str,
    time_slot: &'a str,
    service: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_confirmation.txt")]
struct BookingConfirmationText<'a> {
    business_name: &'a str,
    name: &'a str,
    booking_id: i32,
    date: &'a str,
    time_slot: &'a str,
    service: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_alert.html")]
struct BookingAlertHtml<'a> {
    name: &'a str,
    phone: &'a str,
    email: &'a str,
    date: &'a str,
    time_slot: &'a str,
    service: &'a str,
    booking_id: i32,
}

#[derive(Template)]
#[template(path = "email/booking_alert.txt")]
struct BookingAlertText<'a> {
    name: &'a str,
    phone: &'a str,
    email: &'a str,
    date: &'a str,
    time_slot: &'a str,
    service: &'a str,
    booking_id: i32,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    business_name: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    invoice_id: &'a str,
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    business_name: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    invoice_id: &'a str,
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_code.html")]
struct ResetCodeHtml<'a> {
    code: &'a str,
}

#[derive(Template)]
#[template(path = "email/reset_code.txt")]
struct ResetCodeText<'a> {
    code: &'a str,
}

// =============================================================================
// Message Composition
// =============================================================================

/// Booking confirmation sent to the customer.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn booking_confirmation(
    business_name: &str,
    appointment: &Appointment,
) -> Result<OutboundEmail, NotificationError> {
    let date = appointment.date.format("%Y-%m-%d").to_string();
    let html = BookingConfirmationHtml {
        business_name,
        name: &appointment.name,
        booking_id: appointment.id.as_i32(),
        date: &date,
        time_slot: &appointment.time_slot,
        service: &appointment.service,
    }
    .render()?;
    let text = BookingConfirmationText {
        business_name,
        name: &appointment.name,
        booking_id: appointment.id.as_i32(),
        date: &date,
        time_slot: &appointment.time_slot,
        service: &appointment.service,
    }
    .render()?;

    Ok(OutboundEmail {
        to: appointment.email.to_string(),
        subject: "Appointment Confirmation - Your Booking is Confirmed!".to_string(),
        text_body: text,
        html_body: html,
        attachment: None,
    })
}

/// New-booking alert sent to the business owner.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn booking_alert(
    owner: &Email,
    appointment: &Appointment,
) -> Result<OutboundEmail, NotificationError> {
    let date = appointment.date.format("%Y-%m-%d").to_string();
    let html = BookingAlertHtml {
        name: &appointment.name,
        phone: appointment.phone.as_str(),
        email: appointment.email.as_str(),
        date: &date,
        time_slot: &appointment.time_slot,
        service: &appointment.service,
        booking_id: appointment.id.as_i32(),
    }
    .render()?;
    let text = BookingAlertText {
        name: &appointment.name,
        phone: appointment.phone.as_str(),
        email: appointment.email.as_str(),
        date: &date,
        time_slot: &appointment.time_slot,
        service: &appointment.service,
        booking_id: appointment.id.as_i32(),
    }
    .render()?;

    Ok(OutboundEmail {
        to: owner.to_string(),
        subject: "New Appointment Booked".to_string(),
        text_body: text,
        html_body: html,
        attachment: None,
    })
}

/// Who an order confirmation is about.
pub struct OrderConfirmation<'a> {
    pub business_name: &'a str,
    pub to: &'a Email,
    pub customer_name: &'a str,
    pub customer_phone: &'a str,
    pub invoice_id: &'a str,
    pub total: Price,
}

/// Order confirmation with the invoice PDF attached as `Invoice_<id>.pdf`.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn order_confirmation(
    details: &OrderConfirmation<'_>,
    invoice_pdf: Vec<u8>,
) -> Result<OutboundEmail, NotificationError> {
    let total = details.total.to_string();
    let html = OrderConfirmationHtml {
        business_name: details.business_name,
        customer_name: details.customer_name,
        customer_email: details.to.as_str(),
        customer_phone: details.customer_phone,
        invoice_id: details.invoice_id,
        total: &total,
    }
    .render()?;
    let text = OrderConfirmationText {
        business_name: details.business_name,
        customer_name: details.customer_name,
        customer_email: details.to.as_str(),
        customer_phone: details.customer_phone,
        invoice_id: details.invoice_id,
        total: &total,
    }
    .render()?;

    Ok(OutboundEmail {
        to: details.to.to_string(),
        subject: format!(
            "Invoice & Confirmation - {} [ID: {}]",
            details.business_name, details.invoice_id
        ),
        text_body: text,
        html_body: html,
        attachment: Some(Attachment {
            filename: format!("Invoice_{}.pdf", details.invoice_id),
            content_type: "application/pdf".to_string(),
            bytes: invoice_pdf,
        }),
    })
}

/// Password reset code message.
///
/// # Errors
///
/// Returns `NotificationError::Template` if rendering fails.
pub fn reset_code(to: &Email, code: &str) -> Result<OutboundEmail, NotificationError> {
    Ok(OutboundEmail {
        to: to.to_string(),
        subject: "Password Reset Verification Code".to_string(),
        text_body: ResetCodeText { code }.render()?,
        html_body: ResetCodeHtml { code }.render()?,
        attachment: None,
    })
}

// =============================================================================
// SMTP
// =============================================================================

/// Sends mail through an authenticated STARTTLS relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a notifier from configuration.
    ///
    /// The sender is shown as `"<business name>" <MAIL_FROM>`.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid or the sender address does
    /// not parse.
    pub fn new(config: &EmailConfig, business_name: &str) -> Result<Self, NotificationError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let address = config
            .from_address
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self {
            mailer,
            from: Mailbox::new(Some(business_name.to_string()), address),
        })
    }

    fn build_message(&self, email: OutboundEmail) -> Result<Message, NotificationError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(email.to.clone()))?;

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.text_body),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.html_body),
            );

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject);

        let message = match email.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|_| NotificationError::ContentType(attachment.content_type.clone()))?;
                let part = lettre::message::Attachment::new(attachment.filename)
                    .body(attachment.bytes, content_type);
                builder.multipart(MultiPart::mixed().multipart(body).singlepart(part))?
            }
            None => builder.multipart(body)?,
        };

        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        let to = email.to.clone();
        let subject = email.subject.clone();
        let message = self.build_message(email)?;

        self.mailer.send(message).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

// =============================================================================
// Test Support
// =============================================================================

/// Keeps every message instead of sending it. Can be switched to fail.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: tokio::sync::Mutex<Vec<OutboundEmail>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent message (or accept again).
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Messages accepted so far.
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotificationError::Delivery("relay unavailable".to_string()));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}
