//! Test doubles and fixtures shared by the service tests.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::Mutex;

use super::{AuthService, Notifier, OrganizerService, PaymentService, StatusMachine};
use crate::domain::{
    BankAccount, Event, IssuedCharge, Organizer, OrganizerId, Participant, PaymentConfig,
    PaymentMethod, PaymentStatusId, PaypayCredentials, ProviderSettings,
};
use crate::notify::{MailError, Mailer, OutgoingMail};
use crate::persistence::{InMemoryStore, PaymentStore};
use crate::provider::{ChargeRequest, ChargeState, PaymentProvider, ProviderError};

/// Provider double: succeeds by default, or replays scripted results.
#[derive(Debug, Default)]
pub struct FakeProvider {
    scripted: Mutex<VecDeque<Result<IssuedCharge, ProviderError>>>,
    status: Mutex<Option<ChargeState>>,
    creates: AtomicUsize,
    references: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub async fn push_create(&self, result: Result<IssuedCharge, ProviderError>) {
        self.scripted.lock().await.push_back(result);
    }

    pub async fn set_status(&self, state: ChargeState) {
        *self.status.lock().await = Some(state);
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub async fn references(&self) -> Vec<String> {
        self.references.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_charge(
        &self,
        _credentials: &PaypayCredentials,
        request: &ChargeRequest,
    ) -> Result<IssuedCharge, ProviderError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.references.lock().await.push(request.reference.clone());
        match self.scripted.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(IssuedCharge {
                handle: request.reference.clone(),
                payment_url: Some(format!("https://qr.example/{}", request.reference)),
            }),
        }
    }

    async fn charge_status(
        &self,
        _credentials: &PaypayCredentials,
        _handle: &str,
    ) -> Result<ChargeState, ProviderError> {
        self.status
            .lock()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Transport("no scripted status".to_string()))
    }
}

/// Provider double that rewrites the payment row while its first charge
/// is being created, so the submitting request loses its write.
#[derive(Debug)]
pub struct RacingProvider {
    store: Arc<InMemoryStore>,
    raced: AtomicBool,
    pub inner: FakeProvider,
}

impl RacingProvider {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            raced: AtomicBool::new(false),
            inner: FakeProvider::default(),
        }
    }
}

#[async_trait]
impl PaymentProvider for RacingProvider {
    async fn create_charge(
        &self,
        credentials: &PaypayCredentials,
        request: &ChargeRequest,
    ) -> Result<IssuedCharge, ProviderError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let Ok(id) = request.reference.parse::<PaymentStatusId>() else {
                panic!("first reference is the bare status id");
            };
            let Ok(Some(row)) = self.store.get_status(id).await else {
                panic!("row exists while charging");
            };
            if !matches!(self.store.compare_and_swap_status(&row).await, Ok(true)) {
                panic!("concurrent write should land");
            }
        }
        self.inner.create_charge(credentials, request).await
    }

    async fn charge_status(
        &self,
        credentials: &PaypayCredentials,
        handle: &str,
    ) -> Result<ChargeState, ProviderError> {
        self.inner.charge_status(credentials, handle).await
    }
}

/// Mailer double recording every message.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, OutgoingMail)>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<(String, OutgoingMail)> {
        self.sent.lock().await.clone()
    }

    pub async fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, m)| m.subject.clone())
            .collect()
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, sender: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(503));
        }
        self.sent
            .lock()
            .await
            .push((sender.to_string(), mail.clone()));
        Ok(())
    }
}

/// Services wired against in-memory collaborators.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub mailer: Arc<RecordingMailer>,
    pub machine: Arc<StatusMachine>,
    pub payments: PaymentService,
    pub auth: AuthService,
    pub organizers: OrganizerService,
    pub organizer: Organizer,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(FakeProvider::default());
        let mailer = Arc::new(RecordingMailer::default());

        let dyn_store: Arc<dyn PaymentStore> = Arc::<InMemoryStore>::clone(&store);
        let notifier = Notifier::new(
            Arc::clone(&dyn_store),
            Arc::<RecordingMailer>::clone(&mailer),
            "https://pay.example".to_string(),
        );
        let machine = Arc::new(StatusMachine::new(Arc::clone(&dyn_store), notifier.clone()));
        let payments = PaymentService::new(
            Arc::clone(&dyn_store),
            Arc::<FakeProvider>::clone(&provider),
            Arc::clone(&machine),
        );
        let auth = AuthService::new(
            Arc::clone(&dyn_store),
            Arc::clone(&machine),
            notifier.clone(),
            Duration::minutes(30),
        );
        let organizers =
            OrganizerService::new(Arc::clone(&dyn_store), Arc::clone(&machine), notifier);

        let organizer = Organizer {
            id: OrganizerId::new(),
            email: "organizer@example.com".to_string(),
            mail_sender: Some("organizer@example.com".to_string()),
            default_payment_config_ids: Vec::new(),
        };
        if store.upsert_organizer(&organizer).await.is_err() {
            panic!("seed organizer");
        }

        Self {
            store,
            provider,
            mailer,
            machine,
            payments,
            auth,
            organizers,
            organizer,
        }
    }

    pub async fn config(&self, method: PaymentMethod) -> PaymentConfig {
        let settings = match method {
            PaymentMethod::Paypay => ProviderSettings::Paypay(PaypayCredentials {
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                merchant_id: "merchant".to_string(),
            }),
            PaymentMethod::Bank => ProviderSettings::Bank(BankAccount {
                bank_name: "Example Bank".to_string(),
                branch_name: "Main".to_string(),
                account_type: "ordinary".to_string(),
                account_number: "1234567".to_string(),
                account_holder: "Organizer".to_string(),
            }),
            PaymentMethod::PaypayLink | PaymentMethod::StripeLink | PaymentMethod::Cash => {
                ProviderSettings::Link {
                    payment_link: "https://link.example/pay".to_string(),
                }
            }
        };
        let Ok(config) =
            PaymentConfig::new(self.organizer.id, method, method.label().to_string(), settings)
        else {
            panic!("valid config");
        };
        if self.store.insert_config(&config).await.is_err() {
            panic!("seed config");
        }
        config
    }

    pub async fn event(&self, base_amount: i64, configs: &[&PaymentConfig]) -> Event {
        let mut event = Event::new(self.organizer.id, "Summer BBQ".to_string(), base_amount);
        event.payment_config_ids = configs.iter().map(|c| c.id).collect();
        if self.store.insert_event(&event).await.is_err() {
            panic!("seed event");
        }
        event
    }

    pub async fn verified_participant(&self, email: &str) -> Participant {
        let mut participant = Participant::new(email);
        participant.mark_verified();
        let Ok(stored) = self.store.insert_participant_if_absent(&participant).await else {
            panic!("seed participant");
        };
        stored
    }
}
