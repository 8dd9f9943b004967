#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    let rocket = identity_server::rocket();
    log::info!("Starting identity server");
    rocket
}
