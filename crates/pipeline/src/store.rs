//! Remote object stores.
//!
//! [`BlobStore`] speaks the Vercel Blob HTTP API: a single `PUT` for small
//! files, or the three-step multipart protocol (`create`, `upload` per part,
//! `complete`) for files larger than one part.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use recpost_common::error::{RecpostError, RecpostResult};

use crate::upload::UploadConfig;

const API_VERSION: &str = "7";
const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Per-upload options. Objects are always public.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    /// Always false here: keys are deterministic so re-uploads overwrite.
    pub add_random_suffix: bool,
    pub multipart: bool,
}

/// A successfully uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Object key, e.g. `videos/login.mp4`.
    pub key: String,

    /// Public URL of the object.
    pub url: String,
}

/// Trait for object store backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under `key`, replacing any existing object.
    async fn put(&self, key: &str, path: &Path, opts: &PutOptions) -> RecpostResult<RemoteAsset>;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Vercel Blob client.
#[derive(Debug, Clone)]
pub struct BlobStore {
    client: Client,
    base_url: String,
    part_size: u64,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMultipartResponse {
    key: String,
    upload_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadPartResponse {
    etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletedPart {
    etag: String,
    part_number: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl BlobStore {
    /// Build a client authorized with the configured credential.
    pub fn new(config: &UploadConfig) -> RecpostResult<Self> {
        let bearer = format!("Bearer {}", config.credential().expose());
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|_| RecpostError::config("upload token contains invalid characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| RecpostError::upload(format!("failed to build HTTP client: {e}")))?;

        let base_url = config.settings().base_url.trim_end_matches('/');
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            part_size: DEFAULT_PART_SIZE,
        })
    }

    /// Override the multipart part size.
    pub fn with_part_size(mut self, bytes: u64) -> Self {
        self.part_size = bytes.max(1);
        self
    }

    /// Request against `endpoint` carrying the put headers for `key`.
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        key: &str,
        options: &PutOptions,
    ) -> RequestBuilder {
        let suffix = if options.add_random_suffix { "1" } else { "0" };
        self.client
            .request(method, format!("{}/{}", self.base_url, endpoint))
            .query(&[("pathname", key)])
            .header("x-content-type", &options.content_type)
            .header("x-add-random-suffix", suffix)
            .header("x-allow-overwrite", "1")
    }

    async fn put_single(
        &self,
        key: &str,
        path: &Path,
        options: &PutOptions,
    ) -> RecpostResult<RemoteAsset> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| RecpostError::file_op("read", path, e))?;

        let request = self.request(Method::PUT, "", key, options).body(body);
        let put: PutResponse = parse(send(request, key).await?, key).await?;
        Ok(RemoteAsset {
            key: key.to_string(),
            url: put.url,
        })
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        options: &PutOptions,
    ) -> RecpostResult<RemoteAsset> {
        let create = self
            .request(Method::POST, "mpu", key, options)
            .header("x-mpu-action", "create");
        let created: CreateMultipartResponse = parse(send(create, key).await?, key).await?;
        tracing::debug!(key, upload_id = %created.upload_id, "Started multipart upload");

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| RecpostError::file_op("open", path, e))?;

        let mut parts = Vec::new();
        let mut part_number = 1u32;
        loop {
            let mut chunk = Vec::new();
            (&mut file)
                .take(self.part_size)
                .read_to_end(&mut chunk)
                .await
                .map_err(|e| RecpostError::file_op("read", path, e))?;
            if chunk.is_empty() {
                break;
            }

            let upload = self
                .request(Method::POST, "mpu", key, options)
                .header("x-mpu-action", "upload")
                .header("x-mpu-key", &created.key)
                .header("x-mpu-upload-id", &created.upload_id)
                .header("x-mpu-part-number", part_number.to_string())
                .body(chunk);
            let uploaded: UploadPartResponse = parse(send(upload, key).await?, key).await?;
            tracing::debug!(key, part_number, "Uploaded part");
            parts.push(CompletedPart {
                etag: uploaded.etag,
                part_number,
            });
            part_number += 1;
        }

        let complete = self
            .request(Method::POST, "mpu", key, options)
            .header("x-mpu-action", "complete")
            .header("x-mpu-key", &created.key)
            .header("x-mpu-upload-id", &created.upload_id)
            .json(&parts);
        let put: PutResponse = parse(send(complete, key).await?, key).await?;
        Ok(RemoteAsset {
            key: key.to_string(),
            url: put.url,
        })
    }
}

#[async_trait]
impl ObjectStore for BlobStore {
    async fn put(
        &self,
        key: &str,
        path: &Path,
        options: &PutOptions,
    ) -> RecpostResult<RemoteAsset> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| RecpostError::file_op("stat", path, e))?
            .len();

        if options.multipart && size > self.part_size {
            self.put_multipart(key, path, options).await
        } else {
            self.put_single(key, path, options).await
        }
    }

    fn name(&self) -> &str {
        "vercel-blob"
    }
}

async fn send(request: RequestBuilder, key: &str) -> RecpostResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| RecpostError::upload(format!("{key}: request failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => match parsed.error.code {
            Some(code) => format!("{code}: {}", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body,
    };
    Err(RecpostError::upload(format!("{key}: HTTP {status}: {detail}")))
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response, key: &str) -> RecpostResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| RecpostError::upload(format!("{key}: unexpected response: {e}")))
}
