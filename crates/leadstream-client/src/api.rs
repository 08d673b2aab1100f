//! The lead activity API surface and its HTTP implementation.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use leadstream_core::wire::{
    EditComment, Envelope, FeedResponse, HistoryResponse, LeadUpdate, LikeResponse,
    MutationResponse, NestedReply, NewComment, QuoteReply, RepliesResponse, SearchResponse,
};
use reqwest::{Client, Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Server operations the activity store consumes.
///
/// Implementations turn `success: false` answers into errors, so an `Ok`
/// value is always a confirmed success.
#[async_trait]
pub trait LeadApi: Send + Sync {
    /// Lead plus its full activity list.
    async fn load_feed(&self, lead_id: &str) -> Result<FeedResponse>;

    async fn add_comment(&self, lead_id: &str, body: &NewComment) -> Result<MutationResponse>;

    async fn edit_comment(
        &self,
        lead_id: &str,
        comment_id: &str,
        body: &EditComment,
    ) -> Result<MutationResponse>;

    async fn delete_comment(&self, lead_id: &str, comment_id: &str) -> Result<MutationResponse>;

    /// Returns the authoritative like list after the toggle.
    async fn toggle_like(&self, lead_id: &str, comment_id: &str) -> Result<LikeResponse>;

    async fn toggle_pin(&self, lead_id: &str, comment_id: &str) -> Result<MutationResponse>;

    async fn toggle_important(&self, lead_id: &str, comment_id: &str)
    -> Result<MutationResponse>;

    async fn quote_reply(
        &self,
        lead_id: &str,
        comment_id: &str,
        body: &QuoteReply,
    ) -> Result<MutationResponse>;

    async fn nested_reply(&self, lead_id: &str, body: &NestedReply) -> Result<MutationResponse>;

    /// Complete reply bucket for one top-level comment.
    async fn get_replies(&self, lead_id: &str, parent_id: &str) -> Result<RepliesResponse>;

    async fn get_history(&self, lead_id: &str, comment_id: &str) -> Result<HistoryResponse>;

    async fn search_comments(&self, lead_id: &str, query: &str) -> Result<SearchResponse>;

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<MutationResponse>;
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the dashboard API
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Reject anything that is not an absolute URL with one of `schemes`.
pub(crate) fn check_url(url: &str, schemes: &[&str]) -> Result<()> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if schemes.contains(&parsed.scheme()) => Ok(()),
        _ => Err(ClientError::InvalidUrl(url.to_string())),
    }
}

/// `LeadApi` over HTTP/JSON.
pub struct HttpLeadApi {
    base_url: String,
    client: Client,
}

impl HttpLeadApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/');
        check_url(base_url, &["http", "https"])?;

        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::Validation("Invalid API token"))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    fn lead_url(&self, lead_id: &str, rest: &str) -> String {
        format!(
            "{}/api/leads/{}{}",
            self.base_url,
            urlencoding::encode(lead_id),
            rest
        )
    }

    fn comment_url(&self, lead_id: &str, comment_id: &str, rest: &str) -> String {
        self.lead_url(
            lead_id,
            &format!("/comments/{}{}", urlencoding::encode(comment_id), rest),
        )
    }

    async fn send<T, B>(&self, method: Method, url: String, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned + Envelope,
        B: Serialize + ?Sized,
    {
        tracing::debug!(%method, %url, "request");
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        handle_response(response).await
    }
}

async fn handle_response<T>(response: reqwest::Response) -> Result<T>
where
    T: DeserializeOwned + Envelope,
{
    let status = response.status();
    let text = response.text().await?;

    let parsed = serde_json::from_str::<T>(&text);
    if status.is_success() {
        let parsed = parsed?;
        if parsed.success() {
            return Ok(parsed);
        }
        let message = parsed.message().unwrap_or("Request failed").to_string();
        return Err(rejection(status, message));
    }

    let message = match &parsed {
        Ok(body) => body.message().map(str::to_string),
        Err(_) => None,
    }
    .unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    Err(rejection(status, message))
}

fn rejection(status: StatusCode, message: String) -> ClientError {
    if status == StatusCode::FORBIDDEN || message.contains("Access denied") {
        ClientError::AccessDenied(message)
    } else {
        ClientError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl LeadApi for HttpLeadApi {
    async fn load_feed(&self, lead_id: &str) -> Result<FeedResponse> {
        self.send(Method::GET, self.lead_url(lead_id, "/activity"), NO_BODY)
            .await
    }

    async fn add_comment(&self, lead_id: &str, body: &NewComment) -> Result<MutationResponse> {
        self.send(Method::POST, self.lead_url(lead_id, "/comments"), Some(body))
            .await
    }

    async fn edit_comment(
        &self,
        lead_id: &str,
        comment_id: &str,
        body: &EditComment,
    ) -> Result<MutationResponse> {
        self.send(
            Method::PUT,
            self.comment_url(lead_id, comment_id, ""),
            Some(body),
        )
        .await
    }

    async fn delete_comment(&self, lead_id: &str, comment_id: &str) -> Result<MutationResponse> {
        self.send(
            Method::DELETE,
            self.comment_url(lead_id, comment_id, ""),
            NO_BODY,
        )
        .await
    }

    async fn toggle_like(&self, lead_id: &str, comment_id: &str) -> Result<LikeResponse> {
        self.send(
            Method::POST,
            self.comment_url(lead_id, comment_id, "/like"),
            NO_BODY,
        )
        .await
    }

    async fn toggle_pin(&self, lead_id: &str, comment_id: &str) -> Result<MutationResponse> {
        self.send(
            Method::POST,
            self.comment_url(lead_id, comment_id, "/pin"),
            NO_BODY,
        )
        .await
    }

    async fn toggle_important(
        &self,
        lead_id: &str,
        comment_id: &str,
    ) -> Result<MutationResponse> {
        self.send(
            Method::POST,
            self.comment_url(lead_id, comment_id, "/important"),
            NO_BODY,
        )
        .await
    }

    async fn quote_reply(
        &self,
        lead_id: &str,
        comment_id: &str,
        body: &QuoteReply,
    ) -> Result<MutationResponse> {
        self.send(
            Method::POST,
            self.comment_url(lead_id, comment_id, "/quote"),
            Some(body),
        )
        .await
    }

    async fn nested_reply(&self, lead_id: &str, body: &NestedReply) -> Result<MutationResponse> {
        self.send(Method::POST, self.lead_url(lead_id, "/replies"), Some(body))
            .await
    }

    async fn get_replies(&self, lead_id: &str, parent_id: &str) -> Result<RepliesResponse> {
        self.send(
            Method::GET,
            self.comment_url(lead_id, parent_id, "/replies"),
            NO_BODY,
        )
        .await
    }

    async fn get_history(&self, lead_id: &str, comment_id: &str) -> Result<HistoryResponse> {
        self.send(
            Method::GET,
            self.comment_url(lead_id, comment_id, "/history"),
            NO_BODY,
        )
        .await
    }

    async fn search_comments(&self, lead_id: &str, query: &str) -> Result<SearchResponse> {
        let url = self.lead_url(
            lead_id,
            &format!("/comments/search?q={}", urlencoding::encode(query)),
        );
        self.send(Method::GET, url, NO_BODY).await
    }

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<MutationResponse> {
        self.send(Method::PUT, self.lead_url(lead_id, ""), Some(update))
            .await
    }
}
