use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use tracing::warn;

/// Listing page the whole pipeline starts from.
pub const ANIMAL_LIST_URL: &str = "https://en.wikipedia.org/wiki/List_of_animal_names";

/// Wikimedia asks automated clients for an identifying, contactable agent.
const USER_AGENT: &str =
    "animal_scraper/0.1 (https://example.org/animal-scraper; animal-scraper@example.org) reqwest/0.12";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

pub fn client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}

/// GET a page as text.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = get_with_retry(client, url).await?;
    response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// GET raw bytes (images).
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = get_with_retry(client, url).await?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body of {}", url))?;
    Ok(bytes.to_vec())
}

/// GET with backoff on throttling and server errors; any other non-2xx
/// status is a hard failure.
async fn get_with_retry(client: &Client, url: &str) -> Result<Response> {
    let mut attempt = 0;
    loop {
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }
        let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        if !retryable || attempt == MAX_RETRIES {
            anyhow::bail!("GET {} returned {}", url, status);
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "{} on {} (attempt {}/{}), backing off {:.1}s",
            status,
            url,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
