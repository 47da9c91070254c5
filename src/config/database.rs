//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    GuestPayment, PaymentGroup, PaymentGroupMember, PaymentReminder, ProposalDay, ProposalGuest,
    ProposalInclusion, ProposalStop, TripProposal,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Fallback used when neither `DATABASE_URL` nor `config.toml` names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://trip_ledger.sqlite?mode=rwc";

/// Resolves the database URL, letting `DATABASE_URL` win over the configured value.
#[must_use]
pub fn resolve_database_url(configured: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| configured.to_string())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    tracing::debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables used by the service. Safe to call on every start.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, TripProposal).await?;
    create_table(db, &schema, ProposalDay).await?;
    create_table(db, &schema, ProposalStop).await?;
    create_table(db, &schema, ProposalInclusion).await?;
    create_table(db, &schema, ProposalGuest).await?;
    create_table(db, &schema, GuestPayment).await?;
    create_table(db, &schema, PaymentGroup).await?;
    create_table(db, &schema, PaymentGroupMember).await?;
    create_table(db, &schema, PaymentReminder).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _ = TripProposal::find().limit(1).all(&db).await?;
        let _ = ProposalStop::find().limit(1).all(&db).await?;
        let _ = ProposalGuest::find().limit(1).all(&db).await?;
        let _ = PaymentReminder::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_twice() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
