use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

/// Blob store abstraction: upload bytes, get back a public URL.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn upload_public(
        &self,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String>;
}

/// Supabase Storage client. Objects are written with upsert so a retried
/// registration does not fail on a half-uploaded document.
#[derive(Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }
}

#[async_trait]
impl StorageClient for SupabaseStorage {
    async fn upload_public(
        &self,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let response = self
            .http
            .post(self.object_url(name))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .context("storage upload request")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("storage upload failed: {status} {detail}");
        }

        Ok(self.public_url(name))
    }
}
