//! Email verification gate in front of payment submission.
//!
//! Verification is global per email address: once a participant consumed
//! a token for any event, they can pay for every event without verifying
//! again. Tokens are single use, expire, and are bound to the event whose
//! page requested them.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::{Notifier, StatusMachine};
use crate::domain::participant::{looks_like_email, normalize_email};
use crate::domain::{Event, Participant, PaymentStatus};
use crate::error::GatewayError;
use crate::persistence::PaymentStore;

/// Outcome of a verification request.
#[derive(Debug, Clone)]
pub enum VerificationRequest {
    /// The participant was verified earlier; they may pay right away.
    AlreadyVerified {
        /// The verified participant.
        participant: Participant,
        /// Their payment row for the event, created if absent.
        status: PaymentStatus,
    },
    /// A verification link was mailed.
    LinkSent,
}

/// A consumed verification token.
#[derive(Debug, Clone)]
pub struct Verified {
    /// The event whose page requested the token.
    pub event: Event,
    /// The now verified participant.
    pub participant: Participant,
    /// Their payment row for the event.
    pub status: PaymentStatus,
}

/// Orchestration layer for participant verification.
#[derive(Debug, Clone)]
pub struct AuthService {
    store: Arc<dyn PaymentStore>,
    machine: Arc<StatusMachine>,
    notifier: Notifier,
    token_ttl: Duration,
}

impl AuthService {
    /// Creates a new `AuthService` issuing tokens valid for `token_ttl`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        machine: Arc<StatusMachine>,
        notifier: Notifier,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            machine,
            notifier,
            token_ttl,
        }
    }

    /// Starts verification of `email` from the page of `event_token`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for malformed addresses and
    /// [`GatewayError::EventNotFound`] for unknown or inactive events.
    pub async fn request_verification(
        &self,
        event_token: &str,
        email: &str,
    ) -> Result<VerificationRequest, GatewayError> {
        if !looks_like_email(email) {
            return Err(GatewayError::InvalidRequest(
                "a valid email address is required".to_string(),
            ));
        }
        let event = self.active_event(event_token).await?;
        let mut participant = self
            .store
            .insert_participant_if_absent(&Participant::new(&normalize_email(email)))
            .await?;

        if participant.is_authenticated {
            let status = self.machine.get_or_create(participant.id, event.id).await?;
            tracing::info!(
                participant_id = %participant.id,
                event_id = %event.id,
                "participant already verified"
            );
            return Ok(VerificationRequest::AlreadyVerified {
                participant,
                status,
            });
        }

        let token = participant.issue_token(event.id, self.token_ttl);
        if !self.store.update_participant(&participant).await? {
            return Err(GatewayError::ParticipantNotFound);
        }
        self.notifier
            .verification(&event, &participant.email, &token)
            .await;
        tracing::info!(
            participant_id = %participant.id,
            event_id = %event.id,
            "verification link issued"
        );
        Ok(VerificationRequest::LinkSent)
    }

    /// Consumes a verification token presented on the page of `event_token`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidAuthToken`] for unknown, expired or
    /// foreign tokens and [`GatewayError::EventNotFound`] for unknown or
    /// inactive events.
    pub async fn verify(&self, event_token: &str, token: &str) -> Result<Verified, GatewayError> {
        let event = self.active_event(event_token).await?;
        let mut participant = self
            .store
            .get_participant_by_auth_token(token)
            .await?
            .ok_or(GatewayError::InvalidAuthToken)?;
        if !participant.token_is_live(Utc::now()) {
            tracing::info!(
                participant_id = %participant.id,
                "expired verification token presented"
            );
            return Err(GatewayError::InvalidAuthToken);
        }
        if participant.auth_event_id.is_some_and(|id| id != event.id) {
            return Err(GatewayError::InvalidAuthToken);
        }

        participant.mark_verified();
        if !self.store.update_participant(&participant).await? {
            return Err(GatewayError::ParticipantNotFound);
        }
        let status = self.machine.get_or_create(participant.id, event.id).await?;
        tracing::info!(
            participant_id = %participant.id,
            event_id = %event.id,
            "participant verified"
        );
        Ok(Verified {
            event,
            participant,
            status,
        })
    }

    async fn active_event(&self, token: &str) -> Result<Event, GatewayError> {
        self.store
            .get_event_by_token(token)
            .await?
            .filter(|e| e.is_active)
            .ok_or(GatewayError::EventNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::PaymentState;
    use crate::service::testing::Harness;

    fn token_from(body: &str) -> Option<String> {
        body.split("?token=")
            .nth(1)
            .map(|rest| rest.trim().to_string())
    }

    #[tokio::test]
    async fn verification_round_trip_creates_status() {
        let h = Harness::new().await;
        let event = h.event(1000, &[]).await;

        let Ok(VerificationRequest::LinkSent) = h
            .auth
            .request_verification(&event.payment_token, " New@Example.com")
            .await
        else {
            panic!("link expected");
        };
        let sent = h.mailer.sent().await;
        let Some((sender, mail)) = sent.first() else {
            panic!("verification mail expected");
        };
        assert_eq!(sender, "organizer@example.com");
        assert_eq!(mail.to, "new@example.com");
        let Some(token) = token_from(&mail.body) else {
            panic!("token in link");
        };

        let Ok(verified) = h.auth.verify(&event.payment_token, &token).await else {
            panic!("token should verify");
        };
        assert!(verified.participant.is_authenticated);
        assert_eq!(verified.status.state, PaymentState::Unpaid);
        assert_eq!(verified.status.event_id, event.id);

        assert!(matches!(
            h.auth.verify(&event.payment_token, &token).await,
            Err(GatewayError::InvalidAuthToken)
        ));
    }

    #[tokio::test]
    async fn verification_is_global_per_email() {
        let h = Harness::new().await;
        let second = h.event(2000, &[]).await;
        let participant = h.verified_participant("known@example.com").await;

        let Ok(VerificationRequest::AlreadyVerified { participant: p, status }) = h
            .auth
            .request_verification(&second.payment_token, "known@example.com")
            .await
        else {
            panic!("already verified");
        };
        assert_eq!(p.id, participant.id);
        assert_eq!(status.event_id, second.id);
        assert!(h.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn token_is_bound_to_requesting_event() {
        let h = Harness::new().await;
        let first = h.event(1000, &[]).await;
        let second = h.event(1000, &[]).await;
        let _ = h
            .auth
            .request_verification(&first.payment_token, "x@example.com")
            .await;
        let Ok(Some(participant)) = h.store.get_participant_by_email("x@example.com").await else {
            panic!("participant created");
        };
        let Some(token) = participant.auth_token else {
            panic!("token issued");
        };
        assert!(matches!(
            h.auth.verify(&second.payment_token, &token).await,
            Err(GatewayError::InvalidAuthToken)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let h = Harness::new().await;
        let event = h.event(1000, &[]).await;
        let mut participant = Participant::new("late@example.com");
        let token = participant.issue_token(event.id, Duration::minutes(-1));
        let _ = h.store.insert_participant_if_absent(&participant).await;
        let _ = h.store.update_participant(&participant).await;
        assert!(matches!(
            h.auth.verify(&event.payment_token, &token).await,
            Err(GatewayError::InvalidAuthToken)
        ));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let h = Harness::new().await;
        let event = h.event(1000, &[]).await;
        assert!(matches!(
            h.auth.request_verification(&event.payment_token, "nope").await,
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
