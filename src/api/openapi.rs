//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use super::handlers::{events, pay, payment_configs, settings, system, webhooks};

/// The gateway's OpenAPI document.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "paylink-gateway",
        description = "Payment collection for event organizers: priced conditions, participant email verification and idempotent provider charges."
    ),
    paths(
        pay::event_page,
        pay::request_auth,
        pay::verify,
        pay::participant_payment,
        pay::submit_payment,
        webhooks::paypay_webhook,
        events::list_events,
        events::create_event,
        events::get_event,
        events::update_event,
        events::payment_board,
        events::register_participant,
        events::update_payment,
        events::delete_payment,
        payment_configs::list_configs,
        payment_configs::create_config,
        payment_configs::update_config,
        payment_configs::delete_config,
        settings::get_settings,
        settings::update_settings,
        system::health_handler,
        system::payment_methods_handler,
    ),
    tags(
        (name = "Payment Page", description = "Participant-facing payment page"),
        (name = "Webhooks", description = "Provider notifications"),
        (name = "Events", description = "Organizer event management"),
        (name = "Payments", description = "Organizer payment board"),
        (name = "Payment Configs", description = "Organizer payment method configuration"),
        (name = "Settings", description = "Organizer defaults"),
        (name = "System", description = "Health and catalog"),
    )
)]
pub struct ApiDoc;
