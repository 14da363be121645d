use std::ops::{Deref, DerefMut};

use mongodb::bson::{doc, DateTime};
use mongodb::error::Error as DbError;
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::mongodb::{Coll, Id};

/// Core voter data, as stored in the database.
///
/// Voters are provisioned externally before the election; the only mutation
/// the server ever performs is flipping `has_voted` via [`super::Vote::cast`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Student number: the voter's stable public identifier.
    pub number: String,
    /// Secret login token issued during provisioning. Compared exactly.
    pub token: String,
    /// Display name.
    pub name: String,
    /// Organisational unit, used for turnout breakdowns.
    pub group: String,
    /// Study programme. Informational only.
    pub program: String,
    /// True iff a vote ledger entry exists for this voter.
    pub has_voted: bool,
    pub voted_at: Option<DateTime>,
}

impl VoterCore {
    /// Create a voter that has not yet voted.
    pub fn new(number: String, token: String, name: String, group: String, program: String) -> Self {
        Self {
            number,
            token,
            name,
            group,
            program,
            has_voted: false,
            voted_at: None,
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Voter {
    /// Verify a voter's login credentials.
    ///
    /// The lookup filters on the student number *and* the token, so an
    /// unknown number and a wrong token are indistinguishable by
    /// construction; nothing in the outcome reveals which field was wrong.
    pub async fn verify(
        voters: &Coll<Voter>,
        number: &str,
        token: &str,
    ) -> Result<Voter, VoterAuthError> {
        let credentials = doc! {
            "number": number,
            "token": token,
        };
        let voter = voters
            .find_one(credentials, None)
            .await?
            .ok_or(VoterAuthError::InvalidCredential)?;

        // A used token can no longer log in; this is deliberately
        // distinguishable from a bad credential.
        if voter.has_voted {
            return Err(VoterAuthError::AlreadyVoted);
        }

        Ok(voter)
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Ways a voter login can fail.
#[derive(Debug, thiserror::Error)]
pub enum VoterAuthError {
    #[error("Unknown student number or token")]
    InvalidCredential,
    #[error("This token has already been used to vote")]
    AlreadyVoted,
    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<VoterAuthError> for Error {
    fn from(err: VoterAuthError) -> Self {
        match err {
            VoterAuthError::InvalidCredential => {
                Error::Status(Status::Unauthorized, err.to_string())
            }
            VoterAuthError::AlreadyVoted => Error::Status(Status::Forbidden, err.to_string()),
            VoterAuthError::Store(err) => Error::Db(err),
        }
    }
}
