//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::notify::Mailer;
use crate::persistence::PaymentStore;
use crate::provider::PaymentProvider;
use crate::service::{AuthService, Notifier, OrganizerService, PaymentService, StatusMachine};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Participant payment submission and lookup.
    pub payments: Arc<PaymentService>,
    /// Participant email verification.
    pub auth: Arc<AuthService>,
    /// Organizer events, configurations and payment board.
    pub organizers: Arc<OrganizerService>,
    /// Payment row transitions driven by provider notifications.
    pub status_machine: Arc<StatusMachine>,
}

impl AppState {
    /// Wires the service layer over the given collaborators.
    ///
    /// `app_url` is the public base URL used in mailed links and
    /// `token_ttl` the lifetime of verification tokens.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        provider: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn Mailer>,
        app_url: String,
        token_ttl: Duration,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&store), mailer, app_url);
        let status_machine = Arc::new(StatusMachine::new(Arc::clone(&store), notifier.clone()));
        let payments = Arc::new(PaymentService::new(
            Arc::clone(&store),
            provider,
            Arc::clone(&status_machine),
        ));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&store),
            Arc::clone(&status_machine),
            notifier.clone(),
            token_ttl,
        ));
        let organizers = Arc::new(OrganizerService::new(
            store,
            Arc::clone(&status_machine),
            notifier,
        ));
        Self {
            payments,
            auth,
            organizers,
            status_machine,
        }
    }
}
