//! Participants (payment users) and their email verification state.

use chrono::{DateTime, Duration, Utc};

use super::{EventId, ParticipantId};

/// An end user paying against one or more events.
///
/// Verification is global per email: once `is_authenticated` is set the
/// participant may pay for any event without verifying again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Email address, unique across the system.
    pub email: String,
    /// Display name, if known.
    pub name: Option<String>,
    /// Pending single-use verification token.
    pub auth_token: Option<String>,
    /// Expiry of `auth_token`.
    pub auth_token_expires_at: Option<DateTime<Utc>>,
    /// Event whose page requested the pending token.
    pub auth_event_id: Option<EventId>,
    /// Set permanently once a token has been consumed.
    pub is_authenticated: bool,
    /// Linked chat identity, if any.
    pub chat_user_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Creates an unverified participant.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            id: ParticipantId::new(),
            email: normalize_email(email),
            name: None,
            auth_token: None,
            auth_token_expires_at: None,
            auth_event_id: None,
            is_authenticated: false,
            chat_user_id: None,
            created_at: Utc::now(),
        }
    }

    /// Issues a fresh verification token bound to `event_id`.
    ///
    /// Any previously issued token is replaced.
    pub fn issue_token(&mut self, event_id: EventId, ttl: Duration) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.auth_token = Some(token.clone());
        self.auth_token_expires_at = Some(Utc::now() + ttl);
        self.auth_event_id = Some(event_id);
        token
    }

    /// Returns `true` if a pending token exists and has not expired.
    #[must_use]
    pub fn token_is_live(&self, now: DateTime<Utc>) -> bool {
        self.auth_token.is_some() && self.auth_token_expires_at.is_some_and(|exp| exp > now)
    }

    /// Consumes the pending token and marks the participant verified.
    pub fn mark_verified(&mut self) {
        self.is_authenticated = true;
        self.auth_token = None;
        self.auth_token_expires_at = None;
        self.auth_event_id = None;
    }
}

/// Normalizes an email address for uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal syntactic email check.
#[must_use]
pub fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !email.contains(' ')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_is_live_until_expiry() {
        let mut participant = Participant::new("A@Example.com ");
        assert_eq!(participant.email, "a@example.com");
        let token = participant.issue_token(EventId::new(), Duration::minutes(10));
        assert_eq!(participant.auth_token.as_deref(), Some(token.as_str()));
        assert!(participant.token_is_live(Utc::now()));
        assert!(!participant.token_is_live(Utc::now() + Duration::minutes(11)));
    }

    #[test]
    fn verification_consumes_token() {
        let mut participant = Participant::new("a@example.com");
        let _ = participant.issue_token(EventId::new(), Duration::minutes(10));
        participant.mark_verified();
        assert!(participant.is_authenticated);
        assert!(participant.auth_token.is_none());
        assert!(!participant.token_is_live(Utc::now()));
    }

    #[test]
    fn email_check() {
        assert!(looks_like_email("someone@example.org"));
        assert!(!looks_like_email("someone"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("a b@example.org"));
    }
}
