//! PostgreSQL implementation of the datastore.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PaymentStore;
use super::documents::encode;
use super::models::{EventRow, OrganizerRow, ParticipantRow, PaymentConfigRow, PaymentStatusRow};
use crate::config::GatewayConfig;
use crate::domain::{
    Event, EventId, Organizer, OrganizerId, Participant, ParticipantId, PaymentConfig,
    PaymentConfigId, PaymentStatus, PaymentStatusId,
};
use crate::error::GatewayError;

const EVENT_COLUMNS: &str = "id, organizer_id, name, date, base_amount, conditions, \
     payment_config_ids, cash_enabled, payment_token, is_active, created_at";

const CONFIG_COLUMNS: &str = "id, organizer_id, method, name, settings, created_at";

const PARTICIPANT_COLUMNS: &str = "id, email, name, auth_token, auth_token_expires_at, \
     auth_event_id, is_authenticated, chat_user_id, created_at";

const STATUS_COLUMNS: &str = "id, participant_id, event_id, state, payer_name, amount_due, \
     selections, method, payment_config_id, charge_handle, charge_snapshot, charge_attempt, \
     version, created_at, updated_at";

/// PostgreSQL-backed datastore using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(format!("migration failed: {e}")))?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "postgres store ready"
        );
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PaymentStore for PostgresStore {
    async fn upsert_organizer(&self, organizer: &Organizer) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO organizers (id, email, mail_sender, default_payment_config_ids) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, \
             mail_sender = EXCLUDED.mail_sender, \
             default_payment_config_ids = EXCLUDED.default_payment_config_ids",
        )
        .bind(organizer.id.as_uuid())
        .bind(&organizer.email)
        .bind(&organizer.mail_sender)
        .bind(config_uuids(&organizer.default_payment_config_ids))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_organizer(&self, id: OrganizerId) -> Result<Option<Organizer>, GatewayError> {
        let row = sqlx::query_as::<_, OrganizerRow>(
            "SELECT id, email, mail_sender, default_payment_config_ids \
             FROM organizers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Organizer::from))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, name, date, base_amount, conditions, \
             payment_config_ids, cash_enabled, payment_token, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id.as_uuid())
        .bind(event.organizer_id.as_uuid())
        .bind(&event.name)
        .bind(event.date)
        .bind(event.base_amount)
        .bind(encode(&event.conditions)?)
        .bind(config_uuids(&event.payment_config_ids))
        .bind(event.cash_enabled)
        .bind(&event.payment_token)
        .bind(event.is_active)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE events SET name = $2, date = $3, base_amount = $4, conditions = $5, \
             payment_config_ids = $6, cash_enabled = $7, is_active = $8 WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(event.date)
        .bind(event.base_amount)
        .bind(encode(&event.conditions)?)
        .bind(config_uuids(&event.payment_config_ids))
        .bind(event.cash_enabled)
        .bind(event.is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn get_event_by_token(&self, token: &str) -> Result<Option<Event>, GatewayError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE payment_token = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn list_events(&self, organizer_id: OrganizerId) -> Result<Vec<Event>, GatewayError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(organizer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Event::try_from)
            .collect()
    }

    async fn insert_config(&self, config: &PaymentConfig) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO payment_configs (id, organizer_id, method, name, settings, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(config.id.as_uuid())
        .bind(config.organizer_id.as_uuid())
        .bind(config.method.as_str())
        .bind(&config.name)
        .bind(encode(&config.settings)?)
        .bind(config.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_config(&self, config: &PaymentConfig) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE payment_configs SET method = $2, name = $3, settings = $4 WHERE id = $1",
        )
        .bind(config.id.as_uuid())
        .bind(config.method.as_str())
        .bind(&config.name)
        .bind(encode(&config.settings)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_config(
        &self,
        id: PaymentConfigId,
    ) -> Result<Option<PaymentConfig>, GatewayError> {
        let sql = format!("SELECT {CONFIG_COLUMNS} FROM payment_configs WHERE id = $1");
        sqlx::query_as::<_, PaymentConfigRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentConfig::try_from)
            .transpose()
    }

    async fn list_configs(
        &self,
        organizer_id: OrganizerId,
    ) -> Result<Vec<PaymentConfig>, GatewayError> {
        let sql = format!(
            "SELECT {CONFIG_COLUMNS} FROM payment_configs WHERE organizer_id = $1 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, PaymentConfigRow>(&sql)
            .bind(organizer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PaymentConfig::try_from)
            .collect()
    }

    async fn delete_config(&self, id: PaymentConfigId) -> Result<bool, GatewayError> {
        let result = sqlx::query("DELETE FROM payment_configs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_participant_if_absent(
        &self,
        participant: &Participant,
    ) -> Result<Participant, GatewayError> {
        sqlx::query(
            "INSERT INTO participants (id, email, name, is_authenticated, chat_user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (email) DO NOTHING",
        )
        .bind(participant.id.as_uuid())
        .bind(&participant.email)
        .bind(&participant.name)
        .bind(participant.is_authenticated)
        .bind(&participant.chat_user_id)
        .bind(participant.created_at)
        .execute(&self.pool)
        .await?;

        self.get_participant_by_email(&participant.email)
            .await?
            .ok_or_else(|| {
                GatewayError::PersistenceError("participant vanished after insert".to_string())
            })
    }

    async fn update_participant(&self, participant: &Participant) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE participants SET name = $2, auth_token = $3, auth_token_expires_at = $4, \
             auth_event_id = $5, is_authenticated = $6, chat_user_id = $7 WHERE id = $1",
        )
        .bind(participant.id.as_uuid())
        .bind(&participant.name)
        .bind(&participant.auth_token)
        .bind(participant.auth_token_expires_at)
        .bind(participant.auth_event_id.map(Uuid::from))
        .bind(participant.is_authenticated)
        .bind(&participant.chat_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, GatewayError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Participant::from))
    }

    async fn get_participant_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Participant>, GatewayError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE email = $1");
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Participant::from))
    }

    async fn get_participant_by_auth_token(
        &self,
        token: &str,
    ) -> Result<Option<Participant>, GatewayError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE auth_token = $1");
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Participant::from))
    }

    async fn insert_status_if_absent(
        &self,
        status: &PaymentStatus,
    ) -> Result<PaymentStatus, GatewayError> {
        sqlx::query(
            "INSERT INTO payment_statuses (id, participant_id, event_id, state, selections, \
             charge_attempt, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (participant_id, event_id) DO NOTHING",
        )
        .bind(status.id.as_uuid())
        .bind(status.participant_id.as_uuid())
        .bind(status.event_id.as_uuid())
        .bind(status.state.as_str())
        .bind(encode(&status.selections)?)
        .bind(status.charge_attempt)
        .bind(status.version)
        .bind(status.created_at)
        .bind(status.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_status(status.participant_id, status.event_id)
            .await?
            .ok_or_else(|| {
                GatewayError::PersistenceError("payment status vanished after insert".to_string())
            })
    }

    async fn get_status(
        &self,
        id: PaymentStatusId,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        let sql = format!("SELECT {STATUS_COLUMNS} FROM payment_statuses WHERE id = $1");
        sqlx::query_as::<_, PaymentStatusRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentStatus::try_from)
            .transpose()
    }

    async fn find_status(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        let sql = format!(
            "SELECT {STATUS_COLUMNS} FROM payment_statuses \
             WHERE participant_id = $1 AND event_id = $2"
        );
        sqlx::query_as::<_, PaymentStatusRow>(&sql)
            .bind(participant_id.as_uuid())
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentStatus::try_from)
            .transpose()
    }

    async fn find_status_by_charge_handle(
        &self,
        handle: &str,
    ) -> Result<Option<PaymentStatus>, GatewayError> {
        let sql = format!("SELECT {STATUS_COLUMNS} FROM payment_statuses WHERE charge_handle = $1");
        sqlx::query_as::<_, PaymentStatusRow>(&sql)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?
            .map(PaymentStatus::try_from)
            .transpose()
    }

    async fn list_statuses(&self, event_id: EventId) -> Result<Vec<PaymentStatus>, GatewayError> {
        let sql = format!(
            "SELECT {STATUS_COLUMNS} FROM payment_statuses WHERE event_id = $1 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, PaymentStatusRow>(&sql)
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PaymentStatus::try_from)
            .collect()
    }

    async fn compare_and_swap_status(&self, status: &PaymentStatus) -> Result<bool, GatewayError> {
        let snapshot = status.charge_snapshot.as_ref().map(encode).transpose()?;
        let result = sqlx::query(
            "UPDATE payment_statuses SET state = $3, payer_name = $4, amount_due = $5, \
             selections = $6, method = $7, payment_config_id = $8, charge_handle = $9, \
             charge_snapshot = $10, charge_attempt = $11, updated_at = $12, \
             version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(status.id.as_uuid())
        .bind(status.version)
        .bind(status.state.as_str())
        .bind(&status.payer_name)
        .bind(status.amount_due)
        .bind(encode(&status.selections)?)
        .bind(status.method.map(|m| m.as_str()))
        .bind(status.payment_config_id.map(Uuid::from))
        .bind(&status.charge_handle)
        .bind(snapshot)
        .bind(status.charge_attempt)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_status(
        &self,
        id: PaymentStatusId,
        expected_version: i64,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query("DELETE FROM payment_statuses WHERE id = $1 AND version = $2")
            .bind(id.as_uuid())
            .bind(expected_version)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn config_uuids(ids: &[PaymentConfigId]) -> Vec<Uuid> {
    ids.iter().copied().map(Uuid::from).collect()
}
