use rocket::{
    http::Status,
    response::status::Custom,
    serde::json::{json, Value},
    Catcher, Request, Route,
};

mod admin;
mod auth;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(voting::routes());
    routes.extend(admin::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![fallback]
}

/// Keep the `{success, message}` envelope for errors Rocket generates itself:
/// unmatched routes, failed request guards, malformed JSON bodies.
#[catch(default)]
fn fallback(status: Status, _request: &Request) -> Custom<Value> {
    let message = status.reason().unwrap_or("Unknown error");
    Custom(
        status,
        json!({
            "success": false,
            "message": message,
        }),
    )
}
