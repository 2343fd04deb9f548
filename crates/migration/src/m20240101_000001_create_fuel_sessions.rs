//! Create `fuel_sessions`: one row per saved fuel-split calculation.
//!
//! The typed columns are a queryable projection of `payload`; the payload
//! column holds the verbatim client document.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FuelSessions::Table)
                    .if_not_exists()
                    .col(integer(FuelSessions::Id).primary_key().auto_increment())
                    .col(timestamp_with_time_zone(FuelSessions::CreatedAt).not_null())
                    .col(string_len(FuelSessions::Fuel, 20).not_null())
                    .col(string_len(FuelSessions::TripMode, 10).not_null())
                    .col(double(FuelSessions::Rate).not_null())
                    .col(double(FuelSessions::Cost1).not_null())
                    .col(double(FuelSessions::Cost2).not_null())
                    .col(double(FuelSessions::TotalCost).not_null())
                    .col(double(FuelSessions::TotalLiters).not_null())
                    .col(json(FuelSessions::Payload).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FuelSessions::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FuelSessions { Table, Id, CreatedAt, Fuel, TripMode, Rate, Cost1, Cost2, TotalCost, TotalLiters, Payload }
