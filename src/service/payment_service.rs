//! Payment submission and provider reconciliation.
//!
//! [`PaymentService::submit_payment`] turns a participant's submission
//! into payment instructions while staying safe to retry: a live provider
//! charge for the same method is returned as-is, a provider-side
//! duplicate rejection is recovered from the stored row, and every other
//! provider failure leaves the row untouched.

use std::sync::Arc;

use chrono::Utc;

use super::StatusMachine;
use crate::domain::{
    BankAccount, Event, IssuedCharge, Participant, ParticipantId, PaymentAttempt, PaymentConfig,
    PaymentConfigId, PaymentMethod, PaymentState, PaymentStatus, PaypayCredentials,
    ProviderSettings, Selections,
};
use crate::error::GatewayError;
use crate::persistence::PaymentStore;
use crate::provider::{ChargeRequest, PaymentProvider, ProviderError};

/// Attempts at the reconciliation step before a lost race is surfaced.
const MAX_SUBMIT_ATTEMPTS: usize = 3;

/// A participant's payment submission.
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    /// Submitting participant.
    pub participant_id: ParticipantId,
    /// Name the participant entered.
    pub payer_name: String,
    /// Condition choices.
    pub selections: Selections,
    /// Chosen method.
    pub method: PaymentMethod,
    /// Chosen configuration; required for every method but cash.
    pub payment_config_id: Option<PaymentConfigId>,
}

/// What the participant must do to complete the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentInstructions {
    /// Hand cash to the organizer.
    Cash,
    /// Transfer to this account.
    Bank(BankAccount),
    /// Pay through the organizer's pre-shared link.
    Link {
        /// The stored link, returned verbatim.
        payment_link: String,
    },
    /// Pay the provider charge.
    Charge {
        /// The live charge.
        charge: IssuedCharge,
        /// `true` if the charge was created by an earlier request.
        reused: bool,
    },
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// The row after the submission.
    pub status: PaymentStatus,
    /// Amount the participant owes.
    pub amount_due: i64,
    /// Instructions for the chosen method.
    pub instructions: PaymentInstructions,
}

/// A participant's view of their payment for an event.
#[derive(Debug, Clone)]
pub struct ParticipantPayment {
    /// The event.
    pub event: Event,
    /// The participant.
    pub participant: Participant,
    /// The payment row, if one exists yet.
    pub status: Option<PaymentStatus>,
}

/// Orchestration layer for participant payments.
#[derive(Debug, Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    provider: Arc<dyn PaymentProvider>,
    machine: Arc<StatusMachine>,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        provider: Arc<dyn PaymentProvider>,
        machine: Arc<StatusMachine>,
    ) -> Self {
        Self {
            store,
            provider,
            machine,
        }
    }

    /// Loads an active event by its public payment token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] for unknown or inactive events.
    pub async fn active_event(&self, token: &str) -> Result<Event, GatewayError> {
        self.store
            .get_event_by_token(token)
            .await?
            .filter(|e| e.is_active)
            .ok_or(GatewayError::EventNotFound)
    }

    /// Lists the configurations participants of `event` may choose from.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn enabled_configs(&self, event: &Event) -> Result<Vec<PaymentConfig>, GatewayError> {
        let mut configs = Vec::with_capacity(event.payment_config_ids.len());
        for id in &event.payment_config_ids {
            match self.store.get_config(*id).await? {
                Some(config) if config.organizer_id == event.organizer_id => configs.push(config),
                _ => {
                    tracing::debug!(
                        event_id = %event.id,
                        config_id = %id,
                        "skipping stale payment config"
                    );
                }
            }
        }
        Ok(configs)
    }

    /// Submits a payment for the event behind `event_token`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for a blank name, a missing
    ///   configuration, a method not enabled for the event, or a
    ///   non-positive total.
    /// - [`GatewayError::EventNotFound`], [`GatewayError::ParticipantNotFound`],
    ///   [`GatewayError::PaymentConfigNotFound`] for unknown references.
    /// - [`GatewayError::NotAuthenticated`] for unverified participants.
    /// - [`GatewayError::AlreadyPaid`] once the row is `PAID`.
    /// - [`GatewayError::Provider`] when charge creation fails; the row is
    ///   left unchanged and the call may be retried.
    pub async fn submit_payment(
        &self,
        event_token: &str,
        submission: PaymentSubmission,
    ) -> Result<PaymentReceipt, GatewayError> {
        let payer_name = submission.payer_name.trim().to_string();
        if payer_name.is_empty() {
            return Err(GatewayError::InvalidRequest("name is required".to_string()));
        }
        if submission.method.requires_config() && submission.payment_config_id.is_none() {
            return Err(GatewayError::InvalidRequest(format!(
                "payment_config_id is required for {}",
                submission.method
            )));
        }

        let event = self.active_event(event_token).await?;
        let participant = self
            .store
            .get_participant(submission.participant_id)
            .await?
            .ok_or(GatewayError::ParticipantNotFound)?;
        if !participant.is_authenticated {
            return Err(GatewayError::NotAuthenticated);
        }
        if !event.accepts(submission.method, submission.payment_config_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "payment method {} is not enabled for this event",
                submission.method
            )));
        }
        let config = self.resolve_config(&event, &submission).await?;

        let submission = PaymentSubmission {
            payer_name,
            ..submission
        };
        let mut held = None;
        for _ in 0..MAX_SUBMIT_ATTEMPTS {
            match self
                .reconcile(&event, &participant, &submission, config.as_ref(), &mut held)
                .await
            {
                Err(GatewayError::ConcurrentUpdate) => {
                    tracing::debug!(
                        event_id = %event.id,
                        participant_id = %participant.id,
                        "submission raced; retrying"
                    );
                }
                other => return other,
            }
        }
        Err(GatewayError::ConcurrentUpdate)
    }

    /// Returns the participant's payment view, optionally polling the
    /// provider for a pending charge whose notification may have been lost.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] or
    /// [`GatewayError::ParticipantNotFound`] for unknown references.
    pub async fn participant_payment(
        &self,
        event_token: &str,
        participant_id: ParticipantId,
        refresh: bool,
    ) -> Result<ParticipantPayment, GatewayError> {
        let event = self.active_event(event_token).await?;
        let participant = self
            .store
            .get_participant(participant_id)
            .await?
            .ok_or(GatewayError::ParticipantNotFound)?;
        let mut status = self.store.find_status(participant.id, event.id).await?;

        if refresh
            && let Some(current) = &status
            && self.refresh_charge(current).await?
        {
            status = self.store.get_status(current.id).await?;
        }

        Ok(ParticipantPayment {
            event,
            participant,
            status,
        })
    }

    async fn resolve_config(
        &self,
        event: &Event,
        submission: &PaymentSubmission,
    ) -> Result<Option<PaymentConfig>, GatewayError> {
        if !submission.method.requires_config() {
            return Ok(None);
        }
        let Some(id) = submission.payment_config_id else {
            return Err(GatewayError::InvalidRequest(
                "payment_config_id is required".to_string(),
            ));
        };
        let config = self
            .store
            .get_config(id)
            .await?
            .filter(|c| c.organizer_id == event.organizer_id)
            .ok_or(GatewayError::PaymentConfigNotFound)?;
        if !config.settings.supports(submission.method) {
            return Err(GatewayError::InvalidRequest(format!(
                "payment config {id} cannot serve {}",
                submission.method
            )));
        }
        Ok(Some(config))
    }

    async fn reconcile(
        &self,
        event: &Event,
        participant: &Participant,
        submission: &PaymentSubmission,
        config: Option<&PaymentConfig>,
        held: &mut Option<HeldCharge>,
    ) -> Result<PaymentReceipt, GatewayError> {
        let mut status = self.machine.get_or_create(participant.id, event.id).await?;
        if status.state == PaymentState::Paid {
            return Err(GatewayError::AlreadyPaid);
        }

        if let Some(charge) = status.existing_charge(submission.method) {
            tracing::info!(
                status_id = %status.id,
                handle = %charge.handle,
                "returning existing provider charge"
            );
            let amount_due = status
                .amount_due
                .unwrap_or_else(|| event.total_for(&submission.selections));
            return Ok(PaymentReceipt {
                status,
                amount_due,
                instructions: PaymentInstructions::Charge {
                    charge,
                    reused: true,
                },
            });
        }

        let amount_due = event.total_for(&submission.selections);
        if amount_due <= 0 {
            return Err(GatewayError::InvalidRequest(format!(
                "total amount must be positive, got {amount_due}"
            )));
        }

        let settings = config.map(|c| &c.settings);
        let (instructions, charge) = match (submission.method, settings) {
            (PaymentMethod::Cash, _) => (PaymentInstructions::Cash, None),
            (PaymentMethod::Bank, Some(ProviderSettings::Bank(account))) => {
                (PaymentInstructions::Bank(account.clone()), None)
            }
            (
                PaymentMethod::PaypayLink | PaymentMethod::StripeLink,
                Some(ProviderSettings::Link { payment_link }),
            ) => (
                PaymentInstructions::Link {
                    payment_link: payment_link.clone(),
                },
                None,
            ),
            (PaymentMethod::Paypay, Some(ProviderSettings::Paypay(credentials))) => {
                let reference = status.charge_reference();
                let charge = match held.take() {
                    Some(previous) if previous.matches(&reference, amount_due) => {
                        tracing::debug!(
                            status_id = %status.id,
                            %reference,
                            "reusing charge created before a lost write"
                        );
                        previous.charge
                    }
                    _ => match self
                        .create_charge(event, &status, credentials, amount_due)
                        .await?
                    {
                        ChargeOutcome::Created(charge) => charge,
                        ChargeOutcome::Recovered(receipt) => return Ok(receipt),
                    },
                };
                *held = Some(HeldCharge {
                    reference,
                    amount: amount_due,
                    charge: charge.clone(),
                });
                (
                    PaymentInstructions::Charge {
                        charge: charge.clone(),
                        reused: false,
                    },
                    Some(charge),
                )
            }
            (method, _) => {
                return Err(GatewayError::InvalidRequest(format!(
                    "payment config cannot serve {method}"
                )));
            }
        };

        status.record_attempt(
            PaymentAttempt {
                payer_name: submission.payer_name.clone(),
                selections: submission.selections.clone(),
                method: submission.method,
                payment_config_id: config.map(|c| c.id),
                amount_due,
                charge,
            },
            Utc::now(),
        )?;
        let status = self.machine.commit(status).await?;
        tracing::info!(
            status_id = %status.id,
            method = %submission.method,
            amount = amount_due,
            "payment submitted"
        );
        Ok(PaymentReceipt {
            status,
            amount_due,
            instructions,
        })
    }

    async fn create_charge(
        &self,
        event: &Event,
        status: &PaymentStatus,
        credentials: &PaypayCredentials,
        amount: i64,
    ) -> Result<ChargeOutcome, GatewayError> {
        let request = ChargeRequest {
            reference: status.charge_reference(),
            amount,
            description: event.name.clone(),
        };
        match self.provider.create_charge(credentials, &request).await {
            Ok(charge) => Ok(ChargeOutcome::Created(charge)),
            Err(ProviderError::Duplicate) => {
                tracing::info!(
                    status_id = %status.id,
                    reference = %request.reference,
                    "provider reports duplicate charge; recovering"
                );
                self.recover_duplicate(status, request, amount).await
            }
            Err(e) => {
                tracing::warn!(
                    status_id = %status.id,
                    reference = %request.reference,
                    error = %e,
                    "provider charge creation failed"
                );
                Err(e.into())
            }
        }
    }

    /// A duplicate rejection means an earlier request for the same reference
    /// reached the provider. Prefer the artifact stored by that request;
    /// otherwise adopt the reference as the handle without a URL.
    async fn recover_duplicate(
        &self,
        status: &PaymentStatus,
        request: ChargeRequest,
        amount: i64,
    ) -> Result<ChargeOutcome, GatewayError> {
        let current = self.machine.load(status.id).await?;
        if let Some(charge) = current.existing_charge(PaymentMethod::Paypay) {
            let amount_due = current.amount_due.unwrap_or(amount);
            return Ok(ChargeOutcome::Recovered(PaymentReceipt {
                status: current,
                amount_due,
                instructions: PaymentInstructions::Charge {
                    charge,
                    reused: true,
                },
            }));
        }
        if current.version != status.version {
            return Err(GatewayError::ConcurrentUpdate);
        }
        Ok(ChargeOutcome::Created(IssuedCharge {
            handle: request.reference,
            payment_url: None,
        }))
    }

    /// Polls the provider for a pending charge and applies a final outcome.
    /// Returns `true` if the row may have changed.
    async fn refresh_charge(&self, status: &PaymentStatus) -> Result<bool, GatewayError> {
        let (PaymentState::Pending, Some(PaymentMethod::Paypay), Some(handle), Some(config_id)) = (
            status.state,
            status.method,
            status.charge_handle.as_deref(),
            status.payment_config_id,
        ) else {
            return Ok(false);
        };
        let Some(ProviderSettings::Paypay(credentials)) =
            self.store.get_config(config_id).await?.map(|c| c.settings)
        else {
            return Ok(false);
        };

        match self.provider.charge_status(&credentials, handle).await {
            Ok(state) => {
                tracing::info!(
                    status_id = %status.id,
                    handle,
                    provider_state = %state,
                    "polled provider charge"
                );
                match state.outcome() {
                    Some(outcome) => {
                        self.machine
                            .apply_provider_notification(handle, outcome, None)
                            .await?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            Err(e) => {
                tracing::warn!(
                    status_id = %status.id,
                    handle,
                    error = %e,
                    "provider status poll failed"
                );
                Ok(false)
            }
        }
    }
}

enum ChargeOutcome {
    Created(IssuedCharge),
    Recovered(PaymentReceipt),
}

/// A charge created during one submission, kept across retries so a lost
/// write does not ask the provider for the same reference again.
struct HeldCharge {
    reference: String,
    amount: i64,
    charge: IssuedCharge,
}

impl HeldCharge {
    fn matches(&self, reference: &str, amount: i64) -> bool {
        self.reference == reference && self.amount == amount
    }
}
