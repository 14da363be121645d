use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::admin::Admin,
    mongodb::{Coll, Id},
};

/// An authentication token representing a logged-in admin.
///
/// Issued as a signed, opaque-to-the-client bearer string with an expiry;
/// there is no revocation list or refresh. Callers needing a richer session
/// model should wrap this module rather than the routes using it.
pub struct AuthToken {
    pub id: Id,
}

impl AuthToken {
    /// Create a token for the given admin.
    pub fn for_admin(admin: &Admin) -> Self {
        Self { id: admin.id }
    }

    /// Serialize this token into a bearer string.
    pub fn into_bearer(self, config: &Config) -> String {
        let claims = Claims {
            sub: self.id.to_string(),
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Deserialize and verify a bearer string.
    pub fn from_bearer(bearer: &str, config: &Config) -> Result<Self, Error> {
        let data: TokenData<Claims> = jsonwebtoken::decode(
            bearer,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?;
        let id = data
            .claims
            .sub
            .parse::<Id>()
            .map_err(|_| Error::unauthorized("Malformed token subject"))?;
        Ok(Self { id })
    }
}

/// Bearer token claims: the admin ID plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the `Authorization` header, verify its
    /// signature and expiry, and check the admin it names still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let bearer = match req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
        {
            Some(bearer) => bearer,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Missing bearer token"),
                ));
            }
        };

        let token = match Self::from_bearer(bearer, config) {
            Ok(token) => token,
            Err(_) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Invalid or expired token"),
                ));
            }
        };

        // Check the admin actually exists.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<Admin>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Token does not belong to a current admin"),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}
