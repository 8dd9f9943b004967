use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing to log one line per HTTP request with timing.
///
/// Only the path is logged; query strings and bodies may carry credentials.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let start_time = request.local_cache(Instant::now);
        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        let method = request.method();
        let path = request.uri().path();
        let status = response.status();

        if status.code >= 500 {
            log::warn!("{} {} -> {} ({:.2}ms)", method, path, status.code, elapsed_ms);
        } else {
            log::info!("{} {} -> {} ({:.2}ms)", method, path, status.code, elapsed_ms);
        }
    }
}
