use anyhow::{Context, Result};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

/// A chapter page could not be retrieved. Callers skip the chapter; nothing
/// is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Study-mode page for a chapter of the study Bible.
pub fn chapter_url(origin: &str, book: u32, chapter: u32) -> String {
    format!(
        "{}/en/wol/b/r1/lp-e/nwtsty/{}/{}#study=discover",
        origin.trim_end_matches('/'),
        book,
        chapter
    )
}

pub fn build_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .context("Failed to create HTTP client")
}

/// One GET for the chapter page. Any non-2xx status counts as unavailable.
pub async fn fetch_chapter(
    client: &reqwest::Client,
    origin: &str,
    book: u32,
    chapter: u32,
) -> Result<String, FetchError> {
    let url = chapter_url(origin, book, chapter);
    debug!("GET {}", url);

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(response.text().await?)
}
