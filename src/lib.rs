//! Backend server for the campus student election.
//!
//! Voters authenticate with their student number and a provisioned one-time
//! token, then cast exactly one vote; admins watch live tallies and turnout.
//! The at-most-once voting guarantee lives in [`model::db::Vote::cast`].

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use rocket::{Build, Rocket};

/// Assemble the server: routes, error catchers, and fairings.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
}

/// Connect to the test database server.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::build()
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to the test database")
}

/// Pick a fresh database name, so concurrent tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Assemble a server against an existing connection and database name,
/// running the same startup setup the `DatabaseFairing` would.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let rocket = rocket::build()
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(logging::LoggerFairing);
    let config: Config = rocket.figment().extract().expect("invalid test config");

    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("failed to create indexes");
    let admins = model::mongodb::Coll::from_db(&db);
    model::db::admin::ensure_admin_exists(&admins, config.default_admin_password())
        .await
        .expect("failed to bootstrap the default admin");

    rocket.manage(config).manage(client).manage(db)
}
