use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            stats::{ElectionStats, StatsResponse},
            voter::VoterListResponse,
        },
        db::{candidate::Candidate, vote::Vote, voter::Voter},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_stats, get_voters]
}

#[get("/admin/stats")]
async fn get_stats(
    _token: AuthToken,
    voters: Coll<Voter>,
    votes: Coll<Vote>,
    candidates: Coll<Candidate>,
) -> Result<Json<StatsResponse>> {
    let stats = ElectionStats::compute(&voters, &votes, &candidates).await?;
    Ok(Json(StatsResponse::new(stats)))
}

#[get("/admin/voters")]
async fn get_voters(_token: AuthToken, voters: Coll<Voter>) -> Result<Json<VoterListResponse>> {
    let options = FindOptions::builder().sort(doc! { "number": 1 }).build();
    let everyone = voters.find(None, options).await?.try_collect().await?;
    Ok(Json(VoterListResponse::new(everyone)))
}
