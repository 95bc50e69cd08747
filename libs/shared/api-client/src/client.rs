use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::credentials::CredentialProvider;
use crate::envelope::ApiEnvelope;

pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn get_headers(&self) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.credentials.bearer_token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| AppError::Auth("Session token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Issues a request and unwraps the response envelope, returning its
    /// `data` payload (if any).
    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            AppError::Transport(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message);
            error!("API error ({}): {}", status, message.as_deref().unwrap_or("<no message>"));

            return Err(AppError::Rejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        let envelope: ApiEnvelope<Value> = serde_json::from_str(&text)
            .map_err(|e| AppError::InvalidResponse(format!("Malformed response envelope: {}", e)))?;

        if !envelope.success {
            warn!("API reported failure for {}: {:?}", url, envelope.message);
            return Err(AppError::Rejected {
                status: envelope.status.or(Some(status.as_u16())),
                message: envelope.message,
            });
        }

        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => serde_json::from_value(data)
                .map(Some)
                .map_err(|e| AppError::InvalidResponse(format!("Unexpected response data: {}", e))),
        }
    }

    /// Like [`ApiClient::request`] but a missing `data` payload is an error.
    pub async fn fetch<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request(method, path, body)
            .await?
            .ok_or_else(|| AppError::InvalidResponse(format!("Response for {} carried no data", path)))
    }

    /// For mutating calls whose payload the caller does not need.
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), AppError> {
        self.request::<Value>(method, path, body).await.map(|_| ())
    }
}
