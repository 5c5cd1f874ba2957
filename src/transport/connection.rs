//! Authenticated HTTP access to one Azure DevOps organization.
//!
//! The `reqwest` client is created on the first request and reused for the
//! lifetime of the connection; both API generations share one connection.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::ClientError;
use crate::config::AzureConfig;

const USER_AGENT: &str = concat!("testplan-extract/", env!("CARGO_PKG_VERSION"));
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";
/// Upper bound on followed continuation tokens for one list call.
const MAX_PAGES: usize = 1000;

/// The `{ "count": n, "value": [...] }` envelope of list responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug)]
pub struct AzureConnection {
    organization_url: String,
    token: String,
    timeout: Duration,
    http: OnceCell<Client>,
}

impl AzureConnection {
    pub fn new(organization_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            organization_url: organization_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
            http: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AzureConfig) -> Self {
        Self::new(
            config.organization_url.clone(),
            config.personal_access_token.clone(),
            config.http_timeout,
        )
    }

    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    /// The shared HTTP client, built on first use.
    async fn client(&self) -> Result<&Client, ClientError> {
        self.http
            .get_or_try_init(|| async {
                info!(
                    organization = %self.organization_url,
                    token = %mask_token(&self.token),
                    "Connecting to Azure DevOps"
                );
                Client::builder()
                    .timeout(self.timeout)
                    .user_agent(USER_AGENT)
                    .build()
                    .map_err(ClientError::from)
            })
            .await
    }

    /// Project-scoped REST URL: `{org}/{project}/_apis/{path}`.
    pub fn api_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/{}/_apis/{}",
            self.organization_url,
            urlencoding::encode(project),
            path
        )
    }

    /// Build a request with basic auth (empty user, token as password).
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ClientError> {
        let client = self.client().await?;
        Ok(client
            .request(method, url)
            .basic_auth("", Some(&self.token))
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// GET a single JSON document.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        debug!(url, "GET");
        let response = self.request(Method::GET, url).await?.send().await?;
        let (body, _) = read_body(response).await?;
        decode(&body)
    }

    /// GET a list, following continuation tokens until the last page.
    pub(crate) async fn get_paged<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let page_url = match &token {
                Some(t) => format!("{}&continuationToken={}", url, urlencoding::encode(t)),
                None => url.to_string(),
            };
            debug!(url = %page_url, page, "GET page");
            let response = self.request(Method::GET, &page_url).await?.send().await?;
            let (body, next) = read_body(response).await?;
            let list: ValueList<T> = decode(&body)?;
            items.extend(list.value);

            match next {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => return Ok(items),
            }
        }

        Err(ClientError::Decode(format!(
            "continuation tokens did not end after {} pages",
            MAX_PAGES
        )))
    }

    /// POST a JSON body and decode the JSON response.
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!(url, "POST");
        let response = self.request(Method::POST, url).await?.json(body).send().await?;
        let (body, _) = read_body(response).await?;
        decode(&body)
    }
}

/// Read a response body, converting HTTP errors to `ClientError`.
///
/// Returns the body and the continuation token header, if any.
async fn read_body(response: reqwest::Response) -> Result<(String, Option<String>), ClientError> {
    let status = response.status();

    // An invalid token is answered with a 203 and a sign-in page.
    if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
        return Err(ClientError::Unauthorized);
    }

    if status.is_success() {
        let continuation = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok((response.text().await?, continuation))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, body))
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// First four characters of a secret, for logs.
pub(crate) fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "<none>".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{}...", visible)
}
