//! HTTP client for the match server REST API

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::game::{MatchSnapshot, Move};

use super::{ApiError, MatchServer, RejectReason};

/// Match server client using bearer-token auth
#[derive(Clone)]
pub struct HttpMatchApi {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl HttpMatchApi {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(ApiError::Request)?;

        let response = check_status(response).await?;
        response.json().await.map_err(ApiError::Parse)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(ApiError::Request)?;

        let response = check_status(response).await?;
        response.json().await.map_err(ApiError::Parse)
    }
}

/// Turn a non-success response into an [`ApiError::Api`]
async fn check_status(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Error body shape the server uses for refused actions
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Classify a refusal message into a machine-checkable reason
fn classify_rejection(message: &str) -> RejectReason {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not your turn") {
        RejectReason::NotYourTurn
    } else if lower.contains("already") {
        RejectReason::TurnAlreadyResolved
    } else if lower.contains("over") || lower.contains("finished") {
        RejectReason::MatchOver
    } else {
        RejectReason::Other(message.to_string())
    }
}

#[async_trait]
impl MatchServer for HttpMatchApi {
    async fn fetch_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError> {
        self.get_json(&format!("matches/{}", match_id)).await
    }

    async fn submit_move(
        &self,
        match_id: Uuid,
        turn_index: u32,
        mv: Move,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("matches/{}/turns/{}", match_id, turn_index)))
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .json(&json!({ "move": mv }))
            .send()
            .await
            .map_err(ApiError::Request)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // 4xx refusals carry a reason; everything else is a plain API error.
        if status.is_client_error() && status != StatusCode::UNAUTHORIZED {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| body.clone());
            return Err(ApiError::Rejected(classify_rejection(&message)));
        }
        Err(ApiError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn create_match(&self) -> Result<MatchSnapshot, ApiError> {
        self.post_json("matches").await
    }

    async fn join_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError> {
        self.post_json(&format!("matches/{}", match_id)).await
    }

    async fn list_matches(&self) -> Result<Vec<MatchSnapshot>, ApiError> {
        self.get_json("matches").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_rejection_messages() {
        assert_eq!(
            classify_rejection("It is not your turn"),
            RejectReason::NotYourTurn
        );
        assert_eq!(
            classify_rejection("Move already played for this turn"),
            RejectReason::TurnAlreadyResolved
        );
        assert_eq!(classify_rejection("Match is over"), RejectReason::MatchOver);
        assert_eq!(
            classify_rejection("something else"),
            RejectReason::Other("something else".into())
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = Config::new("http://localhost:5001/", "token");
        let api = HttpMatchApi::new(&config);
        assert_eq!(api.url("matches"), "http://localhost:5001/matches");
    }
}
