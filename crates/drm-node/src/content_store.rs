use anyhow::{Context, Result};
use reqwest::multipart;
use serde::Deserialize;

/// Content-addressed storage for asset bytes. Mirrors `pkg/ipfs.go`'s
/// `UploadtoIPFS`: the core never touches raw content, only the hash
/// the store hands back.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>) -> Result<String>;
    fn gateway_url(&self, cid: &str) -> String;
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Talks to a local IPFS daemon's HTTP API, matching the original's
/// `shell.NewShell("localhost:5001")` client.
pub struct IpfsContentStore {
    client: reqwest::Client,
    api_base: String,
    gateway_base: String,
}

impl IpfsContentStore {
    pub fn new(api_base: impl Into<String>, gateway_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            gateway_base: gateway_base.into(),
        }
    }

    pub fn local() -> Self {
        Self::new("http://localhost:5001", "https://ipfs.io")
    }
}

#[async_trait::async_trait]
impl ContentStore for IpfsContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes));
        let response = self
            .client
            .post(format!("{}/api/v0/add", self.api_base))
            .multipart(form)
            .send()
            .await
            .context("failed to reach content store")?
            .error_for_status()
            .context("content store rejected the upload")?;
        let parsed: AddResponse = response.json().await.context("malformed content store response")?;
        Ok(parsed.hash)
    }

    fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_base, cid)
    }
}
