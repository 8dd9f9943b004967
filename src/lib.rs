#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod test_support;

use crate::auth::{AuthConfig, AuthState, session_store::spawn_pruning_sweep};
use crate::db::IdentityDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use std::sync::Once;

pub use crate::routes::api_routes;

static LOGGER: Once = Once::new();

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// CORS for the single configured front-end origin, with credentials so the
/// browser sends the auth cookies.
fn attach_cors(rocket: Rocket<Build>, origin: &str) -> Rocket<Build> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&[origin]))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors();

    match cors {
        Ok(cors) => rocket.attach(cors),
        Err(err) => {
            log::error!("invalid CORS configuration for {}: {}", origin, err);
            rocket.attach(AdHoc::try_on_ignite("CORS", |rocket| async move {
                Err(rocket)
            }))
        }
    }
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let config = AuthConfig::from_env();
    let cors_origin = config
        .as_ref()
        .map(|config| config.cors_origin.clone())
        .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());

    let rocket = rocket::build()
        .attach(RequestLogger)
        .attach(IdentityDb::init());

    attach_cors(rocket, &cors_origin)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match IdentityDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match db::run_migrations(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Wire both auth strategies over the shared pool
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match config {
                Ok(config) => config,
                Err(err) => {
                    log::error!("auth configuration invalid: {}", err);
                    return Err(rocket);
                }
            };

            let Some(db) = IdentityDb::fetch(&rocket) else {
                log::error!("database pool not available for auth state");
                return Err(rocket);
            };
            let pool = (**db).clone();

            match AuthState::with_pg_pool(config, pool) {
                Ok(state) => Ok(rocket.manage(state)),
                Err(err) => {
                    log::error!("failed to initialize auth state: {}", err);
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::on_liftoff("Spawn Session Sweep", |rocket| {
            Box::pin(async move {
                if let Some(state) = rocket.state::<AuthState>() {
                    let interval = state.config.session_prune_interval();
                    spawn_pruning_sweep(state.sessions.store(), interval);
                    log::info!("session sweep running every {:?}", interval);
                } else {
                    log::error!("failed to spawn session sweep: auth state not found");
                }
            })
        }))
        .mount("/api/v1", api_routes())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .register("/", error::catchers())
}
