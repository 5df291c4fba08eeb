use crate::error::Result;
use async_trait::async_trait;
use halo_core::{ArtworkSource, DynResult};
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Timeout for a single artwork download.
pub const ARTWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain HTTP GET of artwork images.
#[derive(Debug, Clone)]
pub struct HttpArtworkFetcher {
    client: Client,
}

impl HttpArtworkFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(ARTWORK_TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Fetched {} bytes of artwork from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ArtworkSource for HttpArtworkFetcher {
    async fn fetch_bytes(&self, url: &str) -> DynResult<Vec<u8>> {
        Ok(self.fetch(url).await?)
    }
}
