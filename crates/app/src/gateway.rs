use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use url::Url;

use common::collaborator::CollaboratorError;
use common::linked_data::ContentAddress;
use common::store::ContentStore;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

/// Fetches content by address from an HTTP IPFS gateway (`<remote>/ipfs/<cid>`)
#[derive(Debug, Clone)]
pub struct GatewayClient {
    pub remote: Url,
    client: Client,
}

impl GatewayClient {
    pub fn new(remote: &Url) -> Result<Self, GatewayError> {
        let client = Client::builder().build()?;
        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Blobs are stored under raw-codec cids with no directory around them,
    ///  so the filename never appears in the request path
    pub fn url_for(&self, address: &ContentAddress) -> Result<Url, GatewayError> {
        Ok(self.remote.join(&format!("ipfs/{}", address.cid()))?)
    }

    pub async fn fetch(&self, address: &ContentAddress) -> Result<Bytes, GatewayError> {
        let url = self.url_for(address)?;
        tracing::debug!(%url, "fetching from gateway");
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.bytes().await?)
        } else {
            Err(GatewayError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }
}

#[async_trait]
impl ContentStore for GatewayClient {
    async fn put(
        &self,
        _data: Bytes,
        _filename: Option<&str>,
    ) -> Result<ContentAddress, CollaboratorError> {
        Err(CollaboratorError::Rejected("gateway is read-only".into()))
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes, CollaboratorError> {
        let data = self.fetch(address).await.map_err(|e| match e {
            GatewayError::HttpStatus(StatusCode::NOT_FOUND, _) => {
                CollaboratorError::NotFound(address.cid().to_string())
            }
            other => CollaboratorError::Unavailable(other.to_string()),
        })?;
        if !address.verify(&data) {
            return Err(CollaboratorError::Rejected(format!(
                "gateway returned content that does not match {}",
                address.cid()
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_ignores_filename() {
        let client = GatewayClient::new(&Url::parse("https://ipfs.io").unwrap()).unwrap();
        let address = ContentAddress::for_bytes(b"{}", Some("metadata.json".into())).unwrap();
        let url = client.url_for(&address).unwrap();
        assert_eq!(
            url.as_str(),
            format!("https://ipfs.io/ipfs/{}", address.cid())
        );
        assert_eq!(address.filename(), Some("metadata.json"));
    }
}
