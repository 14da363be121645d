//! Database-side types, serialised the way MongoDB stores them.
//!
//! Each entity comes in two flavours: a `*Core` (alias `New*`) without an ID
//! for insertion, and a wrapper carrying the `_id` for reads.

pub mod admin;
pub mod candidate;
pub mod vote;
pub mod voter;

pub use admin::{Admin, AdminCore, NewAdmin};
pub use candidate::{Candidate, CandidateCore, NewCandidate};
pub use vote::{CastError, NewVote, Vote, VoteCore};
pub use voter::{NewVoter, Voter, VoterAuthError, VoterCore};
