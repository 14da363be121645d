use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            candidate::CandidateListResponse,
            vote::{Acknowledgement, VoteRequest},
        },
        db::{
            candidate::Candidate,
            vote::{NewVote, Vote},
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, get_candidates]
}

/// The single state-changing operation of the whole election.
#[post("/vote", data = "<request>", format = "json")]
async fn cast_vote(
    request: Json<VoteRequest>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    votes: Coll<NewVote>,
    db_client: &State<Client>,
) -> Result<Json<Acknowledgement>> {
    if request.voter_id.is_empty() || request.candidate_id.is_empty() {
        return Err(Error::bad_request("Voter ID and candidate ID are required"));
    }
    let voter_id = request
        .voter_id
        .parse::<Id>()
        .map_err(|_| Error::bad_request(format!("Invalid voter ID '{}'", request.voter_id)))?;
    let candidate_id = request.candidate_id.parse::<Id>().map_err(|_| {
        Error::bad_request(format!("Invalid candidate ID '{}'", request.candidate_id))
    })?;

    Vote::cast(
        db_client,
        &voters,
        &candidates,
        &votes,
        voter_id,
        candidate_id,
    )
    .await?;

    Ok(Json(Acknowledgement::ok()))
}

#[get("/candidates")]
async fn get_candidates(candidates: Coll<Candidate>) -> Result<Json<CandidateListResponse>> {
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let register = candidates.find(None, options).await?.try_collect().await?;
    Ok(Json(CandidateListResponse::new(register)))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        futures::future,
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json, Value},
    };

    use crate::model::db::{
        candidate::NewCandidate,
        voter::{NewVoter, Voter},
    };

    use super::*;

    async fn insert_voter(voters: &Coll<NewVoter>, voter: &NewVoter) -> Id {
        voters
            .insert_one(voter, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn insert_candidate(candidates: &Coll<NewCandidate>, candidate: &NewCandidate) -> Id {
        candidates
            .insert_one(candidate, None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn cast<'c>(
        client: &'c Client,
        voter_id: &str,
        candidate_id: &str,
    ) -> rocket::local::asynchronous::LocalResponse<'c> {
        client
            .post(uri!("/api", cast_vote))
            .header(ContentType::JSON)
            .body(json!({ "voter_id": voter_id, "candidate_id": candidate_id }).to_string())
            .dispatch()
            .await
    }

    #[backend_test]
    async fn cast_vote_commits_both_effects(
        client: Client,
        db: Database,
        voters: Coll<NewVoter>,
        candidates: Coll<NewCandidate>,
        votes: Coll<Vote>,
    ) {
        let voter_id = insert_voter(&voters, &NewVoter::example()).await;
        let candidate_id = insert_candidate(&candidates, &NewCandidate::example()).await;

        let response = cast(&client, &voter_id.to_string(), &candidate_id.to_string()).await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], true);

        // Exactly one ledger entry, for the right candidate.
        let ledger: Vec<Vote> = votes
            .find(None, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].voter_id, voter_id);
        assert_eq!(ledger[0].candidate_id, candidate_id);

        // The voter is marked as having voted, with a timestamp.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(voter_id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(voter.has_voted);
        assert!(voter.voted_at.is_some());
    }

    #[backend_test]
    async fn second_vote_rejected(
        client: Client,
        voters: Coll<NewVoter>,
        candidates: Coll<NewCandidate>,
        votes: Coll<Vote>,
    ) {
        let voter_id = insert_voter(&voters, &NewVoter::example()).await;
        let first = insert_candidate(&candidates, &NewCandidate::example()).await;
        let second = insert_candidate(&candidates, &NewCandidate::example2()).await;

        let response = cast(&client, &voter_id.to_string(), &first.to_string()).await;
        assert_eq!(Status::Ok, response.status());

        // Re-voting is rejected regardless of the candidate chosen.
        let response = cast(&client, &voter_id.to_string(), &second.to_string()).await;
        assert_eq!(Status::Forbidden, response.status());
        let response = cast(&client, &voter_id.to_string(), &first.to_string()).await;
        assert_eq!(Status::Forbidden, response.status());

        let ledger_size = votes.count_documents(None, None).await.unwrap();
        assert_eq!(ledger_size, 1);
    }

    #[backend_test]
    async fn concurrent_casts_commit_exactly_once(
        client: Client,
        voters: Coll<NewVoter>,
        candidates: Coll<NewCandidate>,
        votes: Coll<Vote>,
    ) {
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["campusvote_backend"],
            None,
            None,
        );

        let voter_id = insert_voter(&voters, &NewVoter::example()).await;
        let candidate_id = insert_candidate(&candidates, &NewCandidate::example()).await;

        let voter_param = voter_id.to_string();
        let candidate_param = candidate_id.to_string();
        let requests = (0..8).map(|_| cast(&client, &voter_param, &candidate_param));
        let responses = future::join_all(requests).await;

        let successes = responses
            .iter()
            .filter(|r| r.status() == Status::Ok)
            .count();
        let rejections = responses
            .iter()
            .filter(|r| r.status() == Status::Forbidden)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(rejections, responses.len() - 1);

        let ledger_size = votes.count_documents(None, None).await.unwrap();
        assert_eq!(ledger_size, 1);
    }

    #[backend_test]
    async fn unknown_references_are_not_found(
        client: Client,
        voters: Coll<NewVoter>,
        candidates: Coll<NewCandidate>,
    ) {
        let voter_id = insert_voter(&voters, &NewVoter::example()).await;
        let candidate_id = insert_candidate(&candidates, &NewCandidate::example()).await;

        let response = cast(&client, &Id::new().to_string(), &candidate_id.to_string()).await;
        assert_eq!(Status::NotFound, response.status());

        let response = cast(&client, &voter_id.to_string(), &Id::new().to_string()).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn malformed_request_is_bad_request(client: Client) {
        let response = cast(&client, "not-an-id", &Id::new().to_string()).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = cast(&client, &Id::new().to_string(), "not-an-id").await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!("/api", cast_vote))
            .header(ContentType::JSON)
            .body(json!({}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn candidates_listed_in_register_order(client: Client, candidates: Coll<NewCandidate>) {
        let first = insert_candidate(&candidates, &NewCandidate::example()).await;
        let second = insert_candidate(&candidates, &NewCandidate::example2()).await;

        let response = client.get(uri!("/api", get_candidates)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], true);
        let listed = body["candidates"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["id"], first.to_string());
        assert_eq!(listed[0]["name"], NewCandidate::example().name);
        assert_eq!(listed[1]["id"], second.to_string());
        assert_eq!(listed[1]["name"], NewCandidate::example2().name);
    }
}
