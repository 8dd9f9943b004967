use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("identity_db")]
pub struct IdentityDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Applies pending migrations for the `users` and `sessions` tables.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
