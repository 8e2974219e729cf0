//! Outgoing mail dispatch on behalf of organizers.
//!
//! Every send is best effort: failures and missing sender references are
//! logged and swallowed, never returned.

use std::sync::Arc;

use crate::domain::{Event, OrganizerId, PaymentStatus};
use crate::notify::{Mailer, OutgoingMail, templates};
use crate::persistence::PaymentStore;

/// Renders and sends participant-facing mail.
#[derive(Debug, Clone)]
pub struct Notifier {
    store: Arc<dyn PaymentStore>,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl Notifier {
    /// Creates a notifier whose links point at `app_url`.
    #[must_use]
    pub fn new(store: Arc<dyn PaymentStore>, mailer: Arc<dyn Mailer>, app_url: String) -> Self {
        Self {
            store,
            mailer,
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sends the email verification link for `event`.
    pub async fn verification(&self, event: &Event, to: &str, auth_token: &str) {
        let mail = templates::verification(&self.app_url, to, &event.payment_token, auth_token);
        self.deliver(event.organizer_id, mail).await;
    }

    /// Sends the payment page invitation for `event`.
    pub async fn payment_link(&self, event: &Event, to: &str) {
        let mail = templates::payment_link(&self.app_url, to, &event.payment_token, &event.name);
        self.deliver(event.organizer_id, mail).await;
    }

    /// Sends the completion notice for a status that just became `PAID`.
    pub async fn payment_complete(&self, status: &PaymentStatus) {
        let (event, participant) = match (
            self.store.get_event(status.event_id).await,
            self.store.get_participant(status.participant_id).await,
        ) {
            (Ok(Some(event)), Ok(Some(participant))) => (event, participant),
            (event, participant) => {
                tracing::warn!(
                    status_id = %status.id,
                    event_found = matches!(event, Ok(Some(_))),
                    participant_found = matches!(participant, Ok(Some(_))),
                    "cannot address completion mail"
                );
                return;
            }
        };
        let paid_at = status
            .charge_snapshot
            .as_ref()
            .and_then(|s| s.paid_at)
            .unwrap_or(status.updated_at);
        let mail = templates::payment_complete(
            &participant.email,
            &event.name,
            status.amount_due.unwrap_or(event.base_amount),
            status.method,
            paid_at,
        );
        self.deliver(event.organizer_id, mail).await;
    }

    async fn deliver(&self, organizer_id: OrganizerId, mail: OutgoingMail) {
        let sender = match self.store.get_organizer(organizer_id).await {
            Ok(Some(organizer)) => organizer.mail_sender,
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%organizer_id, error = %e, "organizer lookup for mail failed");
                return;
            }
        };
        let Some(sender) = sender else {
            tracing::warn!(
                %organizer_id,
                subject = %mail.subject,
                "organizer has no mail sender; skipping"
            );
            return;
        };
        match self.mailer.send(&sender, &mail).await {
            Ok(()) => {
                tracing::info!(%organizer_id, to = %mail.to, subject = %mail.subject, "mail sent");
            }
            Err(e) => {
                tracing::warn!(%organizer_id, to = %mail.to, error = %e, "mail delivery failed");
            }
        }
    }
}
