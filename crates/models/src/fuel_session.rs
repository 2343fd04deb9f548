use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One persisted fuel-split calculation. The typed columns are extracted
/// from `payload` at write time and never reconciled with it afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fuel_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub fuel: String,
    pub trip_mode: String,
    pub rate: f64,
    pub cost1: f64,
    pub cost2: f64,
    pub total_cost: f64,
    pub total_liters: f64,
    pub payload: Json,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}
