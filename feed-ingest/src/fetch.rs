//! Feed download with a hard timeout and a streaming size cap.

use crate::errors::FeedError;
use std::time::Duration;
use tracing::{debug, info};

pub struct FeedFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl FeedFetcher {
    /// # Errors
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }

    /// Downloads the feed body.
    ///
    /// Rejects non-HTTP(S) URLs and any status other than 200. The body is
    /// consumed chunk by chunk so an oversized feed aborts as soon as the cap
    /// is crossed, not after buffering the whole payload. A timeout surfaces
    /// as `FeedError::Download`; nothing has been written anywhere by then.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FeedError::InvalidUrl(url.to_string()));
        }

        info!("FeedFetcher::download url={}", url);
        let mut response = self.client.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(FeedError::HttpStatus(response.status().as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(FeedError::TooLarge(length as usize));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_bytes {
                return Err(FeedError::TooLarge(body.len()));
            }
        }
        debug!("FeedFetcher::download bytes={}", body.len());
        Ok(body)
    }
}
