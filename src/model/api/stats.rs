use std::collections::HashMap;

use mongodb::bson::{doc, Bson, Document};
use rocket::futures::{try_join, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::api::ApiId;
use crate::model::db::{candidate::Candidate, vote::Vote, voter::Voter};
use crate::model::mongodb::{Coll, Id};

/// Live election statistics for the admin dashboard.
///
/// Tallies are always derived by counting the append-only vote ledger; there
/// are no stored counters to drift or double-count.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStats {
    /// Per-candidate vote counts, zero-filled from the candidate register.
    pub candidates: Vec<CandidateTally>,
    pub total_voted: u64,
    pub total_not_voted: u64,
    /// One entry per group present among voters.
    pub group_stats: Vec<GroupTurnout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTally {
    pub id: ApiId,
    pub name: String,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTurnout {
    pub name: String,
    pub voted: u64,
    pub not_voted: u64,
}

impl ElectionStats {
    /// Compute the current statistics.
    ///
    /// The three reads are logically independent and run concurrently; no
    /// cross-read snapshot is taken, so a tally may briefly reflect a vote
    /// that the participation counts do not. A dashboard refresh makes that
    /// invisible. Any single read failing fails the whole refresh.
    pub async fn compute(
        voters: &Coll<Voter>,
        votes: &Coll<Vote>,
        candidates: &Coll<Candidate>,
    ) -> Result<Self> {
        let (tallies, (total_voted, total_not_voted), group_stats) = try_join!(
            candidate_tallies(candidates, votes),
            participation(voters),
            group_turnout(voters),
        )?;

        Ok(Self {
            candidates: tallies,
            total_voted,
            total_not_voted,
            group_stats,
        })
    }
}

/// Count ledger entries per candidate and zero-fill from the register.
async fn candidate_tallies(
    candidates: &Coll<Candidate>,
    votes: &Coll<Vote>,
) -> Result<Vec<CandidateTally>> {
    let register: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;

    let by_candidate = vec![doc! {
        "$group": {
            "_id": "$candidate_id",
            "total": { "$sum": 1 },
        }
    }];
    let mut counts = HashMap::new();
    let mut cursor = votes.aggregate(by_candidate, None).await?;
    while let Some(group) = cursor.try_next().await? {
        let candidate_id: Id = group.get_object_id("_id")?.into();
        counts.insert(candidate_id, count_field(&group, "total"));
    }

    Ok(zero_filled(register, &counts))
}

/// Pair every registered candidate with its ledger count, defaulting to zero.
fn zero_filled(register: Vec<Candidate>, counts: &HashMap<Id, u64>) -> Vec<CandidateTally> {
    register
        .into_iter()
        .map(|candidate| CandidateTally {
            votes: counts.get(&candidate.id).copied().unwrap_or(0),
            id: candidate.id.into(),
            name: candidate.candidate.name,
        })
        .collect()
}

/// Count voters partitioned by whether they have voted.
async fn participation(voters: &Coll<Voter>) -> Result<(u64, u64)> {
    let voted = voters
        .count_documents(doc! { "has_voted": true }, None)
        .await?;
    let not_voted = voters
        .count_documents(doc! { "has_voted": false }, None)
        .await?;
    Ok((voted, not_voted))
}

/// Count voters per group, partitioned by whether they have voted.
async fn group_turnout(voters: &Coll<Voter>) -> Result<Vec<GroupTurnout>> {
    let by_group = vec![
        doc! {
            "$group": {
                "_id": "$group",
                "voted": { "$sum": { "$cond": ["$has_voted", 1, 0] } },
                "not_voted": { "$sum": { "$cond": ["$has_voted", 0, 1] } },
            }
        },
        doc! { "$sort": { "_id": 1 } },
    ];

    let mut turnout = Vec::new();
    let mut cursor = voters.aggregate(by_group, None).await?;
    while let Some(group) = cursor.try_next().await? {
        turnout.push(GroupTurnout {
            name: group.get_str("_id")?.to_string(),
            voted: count_field(&group, "voted"),
            not_voted: count_field(&group, "not_voted"),
        });
    }
    Ok(turnout)
}

/// Extract an aggregation count, whatever integer width the server chose.
fn count_field(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => *n as u64,
        Some(Bson::Int64(n)) => *n as u64,
        Some(Bson::Double(n)) => *n as u64,
        _ => 0,
    }
}

/// The stats endpoint response.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: ElectionStats,
}

impl StatsResponse {
    pub fn new(stats: ElectionStats) -> Self {
        Self {
            success: true,
            stats,
        }
    }
}
