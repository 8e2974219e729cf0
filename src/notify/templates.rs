//! Plain-text message templates.

use chrono::{DateTime, Utc};

use super::OutgoingMail;
use crate::domain::PaymentMethod;

/// Verification link mail sent when a participant enters their email.
#[must_use]
pub fn verification(app_url: &str, to: &str, event_token: &str, auth_token: &str) -> OutgoingMail {
    let verify_url = format!("{app_url}/pay/{event_token}/verify?token={auth_token}");
    OutgoingMail {
        to: to.to_string(),
        subject: "Email Verification".to_string(),
        body: format!(
            "Please click the following link to verify your email and proceed to payment:\n\n{verify_url}"
        ),
    }
}

/// Invitation mail with the event's payment page link.
#[must_use]
pub fn payment_link(app_url: &str, to: &str, event_token: &str, event_name: &str) -> OutgoingMail {
    let payment_url = format!("{app_url}/pay/{event_token}");
    OutgoingMail {
        to: to.to_string(),
        subject: format!("Payment Request: {event_name}"),
        body: format!(
            "You have been invited to make a payment for \"{event_name}\".\n\n\
             Please click the following link to proceed:\n\n{payment_url}"
        ),
    }
}

/// Confirmation mail sent once when a payment becomes `PAID`.
#[must_use]
pub fn payment_complete(
    to: &str,
    event_name: &str,
    amount: i64,
    method: Option<PaymentMethod>,
    paid_at: DateTime<Utc>,
) -> OutgoingMail {
    let method = method.map_or("-", PaymentMethod::label);
    OutgoingMail {
        to: to.to_string(),
        subject: format!("Payment Completed: {event_name}"),
        body: format!(
            "Your payment for \"{event_name}\" has been completed.\n\n\
             Amount: ¥{}\nPayment Method: {method}\nPaid At: {}\n\n\
             Thank you for your payment.",
            group_thousands(amount),
            paid_at.format("%Y-%m-%d %H:%M UTC"),
        ),
    }
}

fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
