use mongodb::bson::doc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminLoginResponse},
            auth::AuthToken,
            voter::{VoterCredentials, VoterLoginResponse},
        },
        db::{admin::Admin, voter::Voter},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![voter_login, admin_login]
}

#[post("/voter/login", data = "<credentials>", format = "json")]
async fn voter_login(
    credentials: Json<VoterCredentials>,
    voters: Coll<Voter>,
) -> Result<Json<VoterLoginResponse>> {
    if credentials.number.is_empty() || credentials.token.is_empty() {
        return Err(Error::bad_request("Student number and token are required"));
    }

    let voter = Voter::verify(&voters, &credentials.number, &credentials.token).await?;
    Ok(Json(VoterLoginResponse::for_voter(&voter)))
}

#[post("/admin/login", data = "<credentials>", format = "json")]
async fn admin_login(
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<AdminLoginResponse>> {
    let with_username = doc! {
        "username": &credentials.username,
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::unauthorized(
                "No admin found with the provided username and password combination",
            )
        })?;

    let token = AuthToken::for_admin(&admin).into_bearer(config);
    Ok(Json(AdminLoginResponse::new(token, admin.admin.username)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json, Value},
    };

    use crate::model::db::{admin::DEFAULT_ADMIN_USERNAME, voter::NewVoter};

    use super::*;

    async fn login_voter<'c>(
        client: &'c Client,
        body: Value,
    ) -> rocket::local::asynchronous::LocalResponse<'c> {
        client
            .post(uri!("/api", voter_login))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
    }

    async fn login_admin<'c>(
        client: &'c Client,
        body: Value,
    ) -> rocket::local::asynchronous::LocalResponse<'c> {
        client
            .post(uri!("/api", admin_login))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
    }

    #[backend_test]
    async fn voter_login_valid(client: Client, voters: Coll<NewVoter>) {
        let voter = NewVoter::example();
        voters.insert_one(&voter, None).await.unwrap();

        let response = login_voter(
            &client,
            json!({ "number": voter.number, "token": voter.token }),
        )
        .await;

        assert_eq!(Status::Ok, response.status());
        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["voter_name"], voter.name);
        // The returned reference is a real ID, and the token is never echoed.
        assert!(body["voter_id"]
            .as_str()
            .unwrap()
            .parse::<crate::model::mongodb::Id>()
            .is_ok());
        assert!(body.get("token").is_none());
    }

    #[backend_test]
    async fn voter_login_rejection_symmetry(client: Client, voters: Coll<NewVoter>) {
        let voter = NewVoter::example();
        voters.insert_one(&voter, None).await.unwrap();

        // Unknown number with a valid token.
        let response = login_voter(
            &client,
            json!({ "number": "0000000000", "token": voter.token }),
        )
        .await;
        assert_eq!(Status::Unauthorized, response.status());
        let unknown_number = response.into_string().await.unwrap();

        // Known number with a wrong token.
        let response = login_voter(
            &client,
            json!({ "number": voter.number, "token": "not-the-token" }),
        )
        .await;
        assert_eq!(Status::Unauthorized, response.status());
        let wrong_token = response.into_string().await.unwrap();

        // Nothing about the responses reveals which field was wrong.
        assert_eq!(unknown_number, wrong_token);
    }

    #[backend_test]
    async fn voter_login_used_token(client: Client, voters: Coll<NewVoter>) {
        let mut voter = NewVoter::example();
        voter.has_voted = true;
        voters.insert_one(&voter, None).await.unwrap();

        let response = login_voter(
            &client,
            json!({ "number": voter.number, "token": voter.token }),
        )
        .await;

        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn voter_login_missing_fields(client: Client) {
        let response = login_voter(&client, json!({})).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = login_voter(&client, json!({ "number": "2110512077" })).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = login_voter(&client, json!({ "token": "kJ8s-pQ2m-xV4w" })).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn admin_login_valid(client: Client) {
        // The default admin is bootstrapped at startup.
        let response = login_admin(&client, json!(AdminCredentials::default_admin())).await;

        assert_eq!(Status::Ok, response.status());
        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["username"], DEFAULT_ADMIN_USERNAME);
        assert!(!body["token"].as_str().unwrap().is_empty());
    }

    #[backend_test]
    async fn admin_login_invalid(client: Client) {
        // Wrong password.
        let response = login_admin(
            &client,
            json!({ "username": DEFAULT_ADMIN_USERNAME, "password": "wrong" }),
        )
        .await;
        assert_eq!(Status::Unauthorized, response.status());
        let wrong_password = response.into_string().await.unwrap();
        let body: Value = serde_json::from_str(&wrong_password).unwrap();
        assert!(body.get("token").is_none());

        // Unknown username, same rejection.
        let response = login_admin(
            &client,
            json!({ "username": "nobody", "password": "wrong" }),
        )
        .await;
        assert_eq!(Status::Unauthorized, response.status());
        let unknown_username = response.into_string().await.unwrap();
        assert_eq!(wrong_password, unknown_username);

        // Empty credentials.
        let response = login_admin(&client, json!(AdminCredentials::empty())).await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
