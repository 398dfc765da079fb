use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "General",
    responses(
        (status = 200, description = "Welcome message", body = WelcomeResponse)
    )
)]
pub async fn handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Food & Beverage Inventory API! Visit /docs for API documentation."
            .to_string(),
    })
}
