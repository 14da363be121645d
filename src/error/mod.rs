use std::io::Cursor;

use jsonwebtoken::errors::Error as JwtError;
use mongodb::bson::document::ValueAccessError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::Responder,
    serde::json::json,
    Request, Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    BsonValue(#[from] ValueAccessError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, message.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Convert the error into a `{success: false, message}` JSON response.
    ///
    /// Business-rule rejections surface their message verbatim; infrastructure
    /// failures are logged server-side and collapse to a generic message with
    /// no internal detail.
    fn respond_to(self, _req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let (status, message) = match self {
            Self::Status(status, message) => {
                warn!("{} {message}", status.code);
                (status, message)
            }
            Self::Jwt(err) => {
                warn!("Rejected token: {err}");
                (Status::Unauthorized, "Invalid or expired token".to_string())
            }
            Self::Db(err) => {
                error!("Database failure: {err}");
                (
                    Status::InternalServerError,
                    "Something went wrong, please try again".to_string(),
                )
            }
            Self::BsonValue(err) => {
                error!("Malformed database document: {err}");
                (
                    Status::InternalServerError,
                    "Something went wrong, please try again".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "message": message,
        })
        .to_string();

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
