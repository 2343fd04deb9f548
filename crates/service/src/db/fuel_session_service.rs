use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::ServiceError;
use models::fuel_session;

/// Most recent sessions returned by a single listing call.
pub const LIST_LIMIT: u64 = 50;

/// Queryable projection extracted from a client payload at write time.
///
/// The payload stays the source of truth for everything else; these fields
/// may diverge from it if the client sends inconsistent values and are
/// never reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFields {
    pub fuel: String,
    pub trip_mode: String,
    pub rate: f64,
    pub cost1: f64,
    pub cost2: f64,
    pub total_cost: f64,
    pub total_liters: f64,
}

impl SessionFields {
    /// Apply the normalization rules to a client document.
    ///
    /// Costs prefer the per-trip sub-objects and fall back to the legacy
    /// top-level keys only when the sub-object lacks the `cost` key. An
    /// explicit `totalCost` always wins over the derived sum, even a falsy
    /// one. A value that is present but not coercible to a number is a
    /// request error, never silently defaulted.
    pub fn extract(data: &Map<String, Value>) -> Result<Self, ServiceError> {
        let trip1 = data.get("trip1").and_then(Value::as_object);
        let trip2 = data.get("trip2").and_then(Value::as_object);

        let cost1 = coerce_number(
            "cost1",
            trip1
                .and_then(|t| t.get("cost"))
                .or_else(|| data.get("cost1"))
                .unwrap_or(&Value::Null),
        )?;
        let cost2 = coerce_number(
            "cost2",
            trip2
                .and_then(|t| t.get("cost"))
                .or_else(|| data.get("cost2"))
                .unwrap_or(&Value::Null),
        )?;

        let total_cost = match data.get("totalCost") {
            Some(v) => coerce_number("totalCost", v)?,
            None => cost1 + cost2,
        };
        let total_liters = coerce_number("totalLiters", data.get("totalLiters").unwrap_or(&Value::Null))?;
        let rate = coerce_number("rate", data.get("rate").unwrap_or(&Value::Null))?;

        Ok(Self {
            fuel: coerce_text(data.get("fuel")),
            trip_mode: coerce_text(data.get("tripMode")),
            rate,
            cost1,
            cost2,
            total_cost,
            total_liters,
        })
    }
}

/// Persist one session: extract the projection, store the body verbatim as
/// `payload`, stamp `created_at` from the server clock. The id is assigned
/// by the store.
pub async fn create_session(
    db: &DatabaseConnection,
    body: &Value,
) -> Result<fuel_session::Model, ServiceError> {
    let data = normalize_body(body)?;
    let fields = SessionFields::extract(&data)?;
    let am = fuel_session::ActiveModel {
        created_at: Set(Utc::now().into()),
        fuel: Set(fields.fuel),
        trip_mode: Set(fields.trip_mode),
        rate: Set(fields.rate),
        cost1: Set(fields.cost1),
        cost2: Set(fields.cost2),
        total_cost: Set(fields.total_cost),
        total_liters: Set(fields.total_liters),
        payload: Set(Value::Object(data)),
        ..Default::default()
    };
    let row = am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    debug!(id = row.id, "session persisted");
    Ok(row)
}

/// Return up to [`LIST_LIMIT`] sessions ordered by id descending, each as
/// a merged document.
pub async fn list_recent_sessions(db: &DatabaseConnection) -> Result<Vec<Value>, ServiceError> {
    let rows = fuel_session::Entity::find()
        .order_by_desc(fuel_session::Column::Id)
        .limit(LIST_LIMIT)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(rows.into_iter().map(merged_document).collect())
}

/// Delete every stored session unconditionally. Returns the row count.
pub async fn clear_sessions(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let res = fuel_session::Entity::delete_many()
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(rows = res.rows_affected, "cleared all sessions");
    Ok(res.rows_affected)
}

/// The stored payload with the authoritative `id` and `created_at`
/// overlaid. Payload keys of the same name are overwritten.
pub fn merged_document(row: fuel_session::Model) -> Value {
    let mut doc = match row.payload {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    doc.insert("id".to_string(), Value::from(row.id));
    doc.insert("created_at".to_string(), Value::from(row.created_at.to_rfc3339()));
    Value::Object(doc)
}

/// A request body must be a JSON object; falsy bodies (`null`, `false`,
/// `0`, `""`, `[]`) collapse to the empty object.
fn normalize_body(body: &Value) -> Result<Map<String, Value>, ServiceError> {
    match body {
        Value::Object(map) => Ok(map.clone()),
        other if is_falsy(other) => Ok(Map::new()),
        _ => Err(ServiceError::Validation("request body must be a JSON object".to_string())),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

/// Falsy values coerce to 0, `true` to 1, strings must parse as a number.
/// Anything else present-but-non-numeric fails the request.
fn coerce_number(field: &str, value: &Value) -> Result<f64, ServiceError> {
    if is_falsy(value) {
        return Ok(0.0);
    }
    match value {
        Value::Bool(_) => Ok(1.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ServiceError::Validation(format!("field '{field}' is out of numeric range"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ServiceError::Validation(format!("field '{field}' is not numeric: {s:?}"))),
        _ => Err(ServiceError::Validation(format!("field '{field}' is not numeric"))),
    }
}

/// Missing keys yield the empty string; non-string values keep their JSON
/// text.
fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, Database};
    use serde_json::json;

    /// In-memory SQLite with the schema applied. A single pooled connection
    /// so every query sees the same in-memory database.
    async fn setup_test_db() -> Result<DatabaseConnection> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1);
        let db = Database::connect(opts).await?;
        migration::Migrator::up(&db, None).await?;
        Ok(db)
    }

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn empty_document_extracts_defaults() {
        let f = SessionFields::extract(&Map::new()).unwrap();
        assert_eq!(
            f,
            SessionFields {
                fuel: String::new(),
                trip_mode: String::new(),
                rate: 0.0,
                cost1: 0.0,
                cost2: 0.0,
                total_cost: 0.0,
                total_liters: 0.0,
            }
        );
    }

    #[test]
    fn trip_costs_sum_into_total() {
        let data = obj(json!({"trip1": {"cost": 10}, "trip2": {"cost": 5}}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.cost1, 10.0);
        assert_eq!(f.cost2, 5.0);
        assert_eq!(f.total_cost, 15.0);
    }

    #[test]
    fn explicit_total_cost_wins_over_derived_sum() {
        let data = obj(json!({"trip1": {"cost": 10}, "totalCost": 999}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.cost1, 10.0);
        assert_eq!(f.total_cost, 999.0);
    }

    #[test]
    fn explicit_null_total_cost_coerces_to_zero() {
        let data = obj(json!({"trip1": {"cost": 10}, "totalCost": null}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.total_cost, 0.0);
    }

    #[test]
    fn legacy_top_level_cost_fallback() {
        let data = obj(json!({"cost1": 7}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.cost1, 7.0);
        assert_eq!(f.total_cost, 7.0);
    }

    #[test]
    fn null_trip_cost_does_not_fall_back() {
        // The legacy key only applies when the sub-object lacks the `cost`
        // key entirely; an explicit null coerces to 0.
        let data = obj(json!({"trip1": {"cost": null}, "cost1": 7}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.cost1, 0.0);
    }

    #[test]
    fn numeric_strings_parse() {
        let data = obj(json!({"rate": "98.6", "totalLiters": " 12.5 "}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.rate, 98.6);
        assert_eq!(f.total_liters, 12.5);
    }

    #[test]
    fn non_numeric_values_are_request_errors() {
        for data in [
            obj(json!({"rate": "abc"})),
            obj(json!({"totalCost": [1]})),
            obj(json!({"trip1": {"cost": {"a": 1}}})),
        ] {
            match SessionFields::extract(&data) {
                Err(ServiceError::Validation(_)) => (),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn falsy_values_coerce_to_zero_and_true_to_one() {
        let data = obj(json!({"rate": false, "totalLiters": "", "cost1": [], "totalCost": {}}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.rate, 0.0);
        assert_eq!(f.total_liters, 0.0);
        assert_eq!(f.cost1, 0.0);
        assert_eq!(f.total_cost, 0.0);

        let data = obj(json!({"rate": true}));
        assert_eq!(SessionFields::extract(&data).unwrap().rate, 1.0);
    }

    #[test]
    fn labels_coerce_to_text() {
        let data = obj(json!({"fuel": "diesel", "tripMode": 2}));
        let f = SessionFields::extract(&data).unwrap();
        assert_eq!(f.fuel, "diesel");
        assert_eq!(f.trip_mode, "2");

        let f = SessionFields::extract(&Map::new()).unwrap();
        assert_eq!(f.fuel, "");
        assert_eq!(f.trip_mode, "");
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_session(&db, &json!({})).await?;
        let b = create_session(&db, &json!({})).await?;
        assert!(b.id > a.id);
        Ok(())
    }

    #[tokio::test]
    async fn create_with_empty_object_stores_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let row = create_session(&db, &json!({})).await?;
        assert_eq!(row.fuel, "");
        assert_eq!(row.trip_mode, "");
        assert_eq!(row.rate, 0.0);
        assert_eq!(row.cost1, 0.0);
        assert_eq!(row.cost2, 0.0);
        assert_eq!(row.total_cost, 0.0);
        assert_eq!(row.total_liters, 0.0);
        assert_eq!(row.payload, json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn round_trip_merges_id_and_created_at() -> Result<()> {
        let db = setup_test_db().await?;
        // Client-sent id/created_at keys are overwritten by the stored
        // values on the way out.
        let body = json!({"trip1": {"cost": 10}, "note": "coast run", "id": "client-id"});
        let row = create_session(&db, &body).await?;

        let docs = list_recent_sessions(&db).await?;
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc["note"], "coast run");
        assert_eq!(doc["trip1"]["cost"], 10);
        assert_eq!(doc["id"], json!(row.id));
        assert_eq!(doc["created_at"], json!(row.created_at.to_rfc3339()));
        Ok(())
    }

    #[tokio::test]
    async fn list_caps_at_limit_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        for i in 0..55 {
            create_session(&db, &json!({"seq": i})).await?;
        }
        let docs = list_recent_sessions(&db).await?;
        assert_eq!(docs.len(), LIST_LIMIT as usize);
        assert_eq!(docs[0]["seq"], 54);
        let ids: Vec<i64> = docs.iter().map(|d| d["id"].as_i64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
        Ok(())
    }

    #[tokio::test]
    async fn list_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        create_session(&db, &json!({"fuel": "petrol"})).await?;
        create_session(&db, &json!({"fuel": "diesel"})).await?;
        let first = list_recent_sessions(&db).await?;
        let second = list_recent_sessions(&db).await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn clear_removes_everything() -> Result<()> {
        let db = setup_test_db().await?;
        for _ in 0..3 {
            create_session(&db, &json!({"fuel": "lpg"})).await?;
        }
        assert_eq!(clear_sessions(&db).await?, 3);
        assert!(list_recent_sessions(&db).await?.is_empty());
        assert_eq!(clear_sessions(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn falsy_body_collapses_to_empty_object() -> Result<()> {
        let db = setup_test_db().await?;
        let row = create_session(&db, &Value::Null).await?;
        assert_eq!(row.payload, json!({}));
        let row = create_session(&db, &json!([])).await?;
        assert_eq!(row.payload, json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn truthy_non_object_body_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        for body in [json!([1, 2]), json!("petrol"), json!(true)] {
            match create_session(&db, &body).await {
                Err(ServiceError::Validation(_)) => (),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert!(list_recent_sessions(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let body1 = json!({"seq": 1});
        let body2 = json!({"seq": 2});
        let (a, b) = tokio::join!(
            create_session(&db, &body1),
            create_session(&db, &body2)
        );
        let (a, b) = (a?, b?);
        assert_ne!(a.id, b.id);
        assert_eq!(list_recent_sessions(&db).await?.len(), 2);
        Ok(())
    }
}
