use serde::{Deserialize, Serialize};

use crate::model::api::ApiId;
use crate::model::db::candidate::Candidate;

/// A candidate as shown on the voting page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub description: String,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            description: candidate.candidate.description,
        }
    }
}

/// The candidate register.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateListResponse {
    pub success: bool,
    pub candidates: Vec<CandidateDescription>,
}

impl CandidateListResponse {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            success: true,
            candidates: candidates
                .into_iter()
                .map(CandidateDescription::from)
                .collect(),
        }
    }
}
