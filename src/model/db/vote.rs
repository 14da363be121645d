use std::ops::{Deref, DerefMut};

use mongodb::bson::{doc, DateTime};
use mongodb::error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR};
use mongodb::Client;
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::db::{candidate::Candidate, voter::Voter};
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

/// Core vote ledger entry data. Append-only: entries are never mutated or
/// deleted, and tallies are always derived by counting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub candidate_id: Id,
    pub cast_at: DateTime,
}

impl VoteCore {
    pub fn new(voter_id: Id, candidate_id: Id) -> Self {
        Self {
            voter_id,
            candidate_id,
            cast_at: DateTime::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote ledger entry from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Cast a vote: append a ledger entry and mark the voter as having voted,
    /// exactly once.
    ///
    /// Eligibility is decided by a conditional write (the voter document is
    /// only updated if `has_voted` is still false), so the check-then-act
    /// sequence is indivisible per voter at the storage layer. Votes for
    /// unrelated voters are never serialized against each other, and the
    /// guarantee holds across multiple server processes. Both effects happen
    /// inside one session transaction: either the ledger entry and the flag
    /// commit together, or neither does, and a transient failure leaves no
    /// partial state behind.
    pub async fn cast(
        db_client: &Client,
        voters: &Coll<Voter>,
        candidates: &Coll<Candidate>,
        votes: &Coll<NewVote>,
        voter_id: Id,
        candidate_id: Id,
    ) -> Result<(), CastError> {
        // Both references must exist; absence is a caller error, not a
        // transaction failure.
        let voter = voters
            .find_one(voter_id.as_doc(), None)
            .await?
            .ok_or(CastError::VoterNotFound(voter_id))?;
        candidates
            .find_one(candidate_id.as_doc(), None)
            .await?
            .ok_or(CastError::CandidateNotFound(candidate_id))?;

        // Fast path; the conditional write below remains authoritative.
        if voter.has_voted {
            return Err(CastError::AlreadyVoted);
        }

        // Concurrent transactions touching the same voter abort each other
        // with a transient write conflict; the storage layer asks us to
        // replay, and the replay resolves through the conditional write to
        // `AlreadyVoted`.
        loop {
            match Self::try_cast(db_client, voters, votes, voter_id, candidate_id).await {
                Err(CastError::Store(err)) if err.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                    continue;
                }
                outcome => return outcome,
            }
        }
    }

    /// One transaction attempt: claim the voter's vote and append the ledger
    /// entry, or abort leaving no trace.
    async fn try_cast(
        db_client: &Client,
        voters: &Coll<Voter>,
        votes: &Coll<NewVote>,
        voter_id: Id,
        candidate_id: Id,
    ) -> Result<(), CastError> {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        // The linearization point: claims the voter's single vote iff it is
        // still unclaimed.
        let eligible = doc! {
            "_id": *voter_id,
            "has_voted": false,
        };
        let mark_voted = doc! {
            "$set": {
                "has_voted": true,
                "voted_at": DateTime::now(),
            }
        };
        let result = voters
            .update_one_with_session(eligible, mark_voted, None, &mut session)
            .await?;
        if result.matched_count == 0 {
            let _ = session.abort_transaction().await;
            return Err(CastError::AlreadyVoted);
        }

        let vote = NewVote::new(voter_id, candidate_id);
        let inserted = votes
            .insert_one_with_session(&vote, None, &mut session)
            .await;
        if is_duplicate_key_error(inserted.as_ref().map(|_| ())) {
            // The ledger already holds an entry for this voter. Unreachable
            // while the flag invariant holds, but the unique index makes the
            // at-most-once guarantee independent of it.
            let _ = session.abort_transaction().await;
            return Err(CastError::AlreadyVoted);
        }
        inserted?;

        session.commit_transaction().await?;
        Ok(())
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// Ways casting a vote can fail. `Store` failures are safe to retry: the
/// transaction aborted, so nothing was committed.
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    #[error("No voter found with ID {0}")]
    VoterNotFound(Id),
    #[error("No candidate found with ID {0}")]
    CandidateNotFound(Id),
    #[error("You have already voted")]
    AlreadyVoted,
    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<CastError> for Error {
    fn from(err: CastError) -> Self {
        match err {
            CastError::VoterNotFound(_) | CastError::CandidateNotFound(_) => {
                Error::Status(Status::NotFound, err.to_string())
            }
            CastError::AlreadyVoted => Error::Status(Status::Forbidden, err.to_string()),
            CastError::Store(err) => Error::Db(err),
        }
    }
}
