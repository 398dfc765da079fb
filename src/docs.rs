use utoipa::OpenApi;

use crate::error::{ErrorResponse, FieldError};
use crate::models::item::{CreationInput, ItemOutput, UpdateInput};
use crate::routes::{health, items, root};

/// OpenAPI document served at `/openapi.json` and rendered at `/docs` and `/redoc`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Food & Beverage Inventory API",
        description = "A simple REST API for managing food and beverage inventory items.",
        version = "1.0.0"
    ),
    paths(
        root::handler,
        health::health,
        items::create,
        items::list,
        items::get_by_id,
        items::update,
        items::delete,
    ),
    components(
        schemas(
            CreationInput,
            UpdateInput,
            ItemOutput,
            ErrorResponse,
            FieldError,
            health::HealthResponse,
            root::WelcomeResponse,
        )
    ),
    tags(
        (name = "Inventory Items", description = "Create, list, read, update and delete inventory items"),
        (name = "General", description = "Service information")
    )
)]
pub struct ApiDoc;
