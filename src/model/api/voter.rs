use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::api::ApiId;
use crate::model::db::voter::Voter;

/// Raw voter credentials, received at login.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoterCredentials {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub token: String,
}

/// Successful voter login: the minimal voter reference the voting page needs.
/// Never echoes the token back.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoterLoginResponse {
    pub success: bool,
    pub voter_id: ApiId,
    pub voter_name: String,
}

impl VoterLoginResponse {
    pub fn for_voter(voter: &Voter) -> Self {
        Self {
            success: true,
            voter_id: voter.id.into(),
            voter_name: voter.name.clone(),
        }
    }
}

/// One row of the admin voter list.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterSummary {
    pub number: String,
    pub name: String,
    pub group: String,
    pub program: String,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<Utc>>,
}

impl From<Voter> for VoterSummary {
    fn from(voter: Voter) -> Self {
        Self {
            number: voter.voter.number,
            name: voter.voter.name,
            group: voter.voter.group,
            program: voter.voter.program,
            has_voted: voter.voter.has_voted,
            voted_at: voter.voter.voted_at.map(|at| at.to_chrono()),
        }
    }
}

/// The admin voter list.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoterListResponse {
    pub success: bool,
    pub voters: Vec<VoterSummary>,
}

impl VoterListResponse {
    pub fn new(voters: Vec<Voter>) -> Self {
        Self {
            success: true,
            voters: voters.into_iter().map(VoterSummary::from).collect(),
        }
    }
}
