use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;

use identity_server::auth::validation::parse_registration;
use identity_server::auth::{AuthError, AuthService, PasswordService, PgCredentialStore};

#[derive(Parser, Debug)]
#[command(
    name = "create_user",
    about = "Create a user account directly in the identity database"
)]
struct Args {
    /// Email address for the account (stored exactly as given).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    /// Display name, at most 50 characters.
    #[arg(long)]
    name: String,

    /// Password hash cost; should match the server's IDENTITY_PASSWORD_HASH_COST.
    #[arg(long, default_value_t = 10)]
    cost: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let new_user = match parse_registration(&json!({
        "email": &args.email,
        "password": &args.password,
        "name": &args.name,
    })) {
        Ok(new_user) => new_user,
        Err(AuthError::Validation(errors)) => {
            for error in errors {
                writeln!(io::stderr(), "error: {error}")?;
            }
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let store = PgCredentialStore::new(pool, Duration::from_secs(10));
    let service = AuthService::new(Arc::new(store), Arc::new(PasswordService::new(args.cost)?));

    match service.register_user(new_user).await {
        Ok(user) => {
            println!("Created user '{}' with id {}", user.email, user.id);
            Ok(())
        }
        Err(AuthError::Conflict) => {
            writeln!(
                io::stderr(),
                "error: a user with email '{}' already exists.",
                args.email
            )?;
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
