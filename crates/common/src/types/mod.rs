use serde::{Deserialize, Serialize};

/// Liveness marker returned by the root endpoint.
#[derive(Serialize, Deserialize, Debug)]
pub struct ServiceStatus {
    pub ok: bool,
    pub service: &'static str,
}

/// Health probe response with the current server time.
#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub ok: bool,
    pub service: &'static str,
    pub time: String,
}

/// Deploy marker exposed on /api/version.
#[derive(Serialize, Deserialize, Debug)]
pub struct VersionInfo {
    pub ok: bool,
    pub version: &'static str,
    pub time: String,
}

/// Response for a successful session create: the store-assigned id.
#[derive(Serialize, Deserialize, Debug)]
pub struct SessionCreated {
    pub ok: bool,
    pub id: i32,
}

/// Bare success indicator, used by the bulk delete.
#[derive(Serialize, Deserialize, Debug)]
pub struct Ack {
    pub ok: bool,
}
