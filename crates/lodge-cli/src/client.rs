//! HTTP client for the Lodge verification service.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lodge_common::constants::routes;
use lodge_common::{IssueRequest, IssueResponse, ValidateRequest, ValidateResponse};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::session::CodeVerifier;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub struct LodgeClient {
    http: Client,
    base_url: String,
}

impl LodgeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the service to issue and deliver a fresh code
    pub async fn request_code(&self, email: &str) -> Result<IssueResponse> {
        self.post(
            routes::ISSUE,
            &IssueRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.endpoint_url(path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await.unwrap_or(Value::Null);

            return Err(anyhow!(
                "{} - {}, {}",
                url,
                status,
                json_response["error"].as_str().unwrap_or("")
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Error parsing JSON response from {url}"))
    }
}

#[async_trait]
impl CodeVerifier for LodgeClient {
    async fn verify(&self, email: &str, code: &str) -> Result<bool> {
        let response: ValidateResponse = self
            .post(
                routes::VALIDATE,
                &ValidateRequest {
                    email: email.to_string(),
                    code: code.to_string(),
                },
            )
            .await?;

        Ok(response.success)
    }
}
