//! Shared HTTP transport for the scraping adapters.

use cambio_common::time::constants;

use crate::error::SourceResult;

/// Providers block obvious bot traffic, so requests carry a browser UA.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build the client shared by every adapter.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(constants::source_fetch_timeout())
        .build()
}

/// Fetch a provider page and return its body as text.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> SourceResult<String> {
    let response = client.get(url).send().await?;
    let body = response.error_for_status()?.text().await?;
    Ok(body)
}
