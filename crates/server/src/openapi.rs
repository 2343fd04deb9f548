use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

/// Free-form client payload. Every field is optional; the whole document is
/// stored verbatim and these are only the keys the store projects out.
#[derive(Serialize, ToSchema)]
pub struct SessionPayloadDoc {
    pub fuel: Option<String>,
    #[serde(rename = "tripMode")]
    pub trip_mode: Option<String>,
    pub rate: Option<f64>,
    pub trip1: Option<TripDoc>,
    pub trip2: Option<TripDoc>,
    pub cost1: Option<f64>,
    pub cost2: Option<f64>,
    #[serde(rename = "totalCost")]
    pub total_cost: Option<f64>,
    #[serde(rename = "totalLiters")]
    pub total_liters: Option<f64>,
}

/// One leg of a two-part trip.
#[derive(Serialize, ToSchema)]
pub struct TripDoc {
    pub cost: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionCreatedDoc {
    pub ok: bool,
    pub id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct AckDoc {
    pub ok: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::root,
        crate::routes::health,
        crate::routes::version,
        crate::routes::list_sessions,
        crate::routes::create_session,
        crate::routes::clear_sessions,
    ),
    components(schemas(SessionPayloadDoc, TripDoc, SessionCreatedDoc, AckDoc)),
    tags(
        (name = "sessions", description = "Fuel-split session persistence"),
        (name = "status", description = "Liveness and deploy markers")
    )
)]
pub struct ApiDoc;
