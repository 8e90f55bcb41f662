//! HTTP implementation of the reading service gateway

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{
    Gateway, PurchaseReceipt, PurchaseRequest, QuizScore, QuizSubmission, ReadingRequest,
};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::types::{CardDeck, CoinPackage, QuizQuestion, Quote, Reader, Reading, ReadingType};

/// Error body returned by the service on non-success responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Gateway that talks JSON over HTTP to the reading service
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(&config.service.base_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("arcana/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("GET {} failed: {}", url, e)))?;

        decode(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("POST {} failed: {}", url, e)))?;

        decode(response).await
    }
}

/// Turn a response into a typed body or a gateway error
///
/// Non-success statuses keep the service's `error` string when the body
/// has one, so it can be shown verbatim.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| GatewayError::Network(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty());

        return Err(GatewayError::Service {
            status: status.as_u16(),
            message,
        }
        .into());
    }

    serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()).into())
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_readers(&self) -> Result<Vec<Reader>> {
        self.get_json("readers").await
    }

    async fn fetch_cards(&self) -> Result<CardDeck> {
        self.get_json("cards").await
    }

    async fn fetch_reading_types(&self) -> Result<BTreeMap<String, ReadingType>> {
        self.get_json("reading-types").await
    }

    async fn fetch_coin_packages(&self) -> Result<Vec<CoinPackage>> {
        self.get_json("coin-packages").await
    }

    async fn fetch_quiz_questions(&self) -> Result<Vec<QuizQuestion>> {
        self.get_json("quiz/questions").await
    }

    async fn fetch_quote(&self) -> Result<Quote> {
        self.get_json("quote").await
    }

    async fn request_reading(&self, request: &ReadingRequest) -> Result<Reading> {
        self.post_json("reading", request).await
    }

    async fn purchase_coins(
        &self,
        user_id: &str,
        request: &PurchaseRequest,
    ) -> Result<PurchaseReceipt> {
        self.post_json(&format!("user/{}/purchase", user_id), request)
            .await
    }

    async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizScore> {
        self.post_json("quiz/submit", submission).await
    }
}
