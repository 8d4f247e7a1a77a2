//! HTTP client for the refern private API.
//!
//! All requests go to the fixed production host and carry the user's
//! authorization token plus the Origin/Referer headers the service expects
//! from its official web client.

use std::io::Write;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{AppError, ExportState, ExportStatus, Folder, FolderItem, ItemKind, Result};

use super::storage;

/// Production API host.
pub const BASE_URL: &str = "https://prod.api.refern.app";

/// Origin/Referer value mimicking the official web client.
pub const WEB_ORIGIN: &str = "https://my.refern.app";

/// Authenticated client for the handful of endpoints the takeout flow needs.
pub struct RefernApi {
    client: Client,
    base_url: String,
}

impl RefernApi {
    /// Builds a client with the authorization token baked into every request.
    ///
    /// # Errors
    /// Returns error if the token contains bytes invalid in an HTTP header.
    pub fn new(token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(token).map_err(|_| AppError::Config {
            message: "Authorization token contains invalid header characters".into(),
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ORIGIN, HeaderValue::from_static(WEB_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(WEB_ORIGIN));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::request("Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Resolves a username/handle (with or without a leading `@`) to a user id.
    pub async fn resolve_user_id(&self, username: &str) -> Result<String> {
        let handle = username.trim_start_matches('@');
        let user: UserRef = self.get_json(&format!("/user/at/{handle}")).await?;
        Ok(user.id)
    }

    /// Lists every folder owned by the user.
    pub async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
        self.get_json(&format!("/folder/user/{user_id}")).await
    }

    /// Lists the boards and collections directly inside one folder.
    pub async fn list_folder_items(&self, folder_id: &str) -> Result<Vec<FolderItem>> {
        let raw: Vec<RawFolderItem> = self.get_json(&format!("/folder/{folder_id}/item")).await?;
        Ok(raw
            .into_iter()
            .map(|item| FolderItem {
                id: item.id,
                kind: item.kind,
                name: item.name,
                parent_folder_id: folder_id.to_string(),
            })
            .collect())
    }

    /// Fetches a board's full payload, passed through untouched.
    pub async fn get_board(&self, board_id: &str) -> Result<serde_json::Value> {
        self.get_json(&format!("/board/{board_id}")).await
    }

    /// Fetches the current export status of a collection.
    ///
    /// The service signals "never exported" with a 404; only this lookup
    /// translates that into `None` instead of an error.
    pub async fn export_status(&self, collection_id: &str) -> Result<Option<ExportStatus>> {
        let url = format!("{}/collection/download/{collection_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::request(format!("GET {url}"), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response)?;
        let raw: RawExportStatus = decode_json(response).await?;
        Ok(Some(raw.validate()?))
    }

    /// Requests a new export job for a collection.
    ///
    /// The format parameters are fixed: JSON metadata for both the
    /// collection and its images.
    pub async fn trigger_export(
        &self,
        collection_id: &str,
        user_id: &str,
    ) -> Result<ExportStatus> {
        let url = format!("{}/collection/download/{collection_id}", self.base_url);
        let body = json!({
            "collectionMetadataExportFileType": "json",
            "creatorUserId": user_id,
            "imageMetadataExportFileType": "json",
        });

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::request(format!("POST {url}"), e))?;

        let response = check_status(response)?;
        let raw: RawExportStatus = decode_json(response).await?;
        raw.validate()
    }

    /// Deletes a prior export job so a fresh one can be triggered.
    pub async fn delete_export(&self, collection_id: &str, export_id: &str) -> Result<()> {
        let url = format!("{}/collection/download/{export_id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .header("Resource-Id", collection_id)
            .header("Resource-Type", "collection")
            .send()
            .await
            .map_err(|e| AppError::request(format!("DELETE {url}"), e))?;

        check_status(response)?;
        Ok(())
    }

    /// Streams a finished export archive from its (absolute) download URL
    /// to a file, creating parent directories as needed.
    ///
    /// Archives can be large, so the body is written chunk by chunk rather
    /// than buffered in memory.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::request(format!("GET {url}"), e))?;

        let mut response = check_status(response)?;
        let mut file = storage::create_file(path)?;
        let mut written = 0usize;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::request(format!("Reading body of {url}"), e))?
        {
            file.write_all(&chunk)
                .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;
            written += chunk.len();
        }

        tracing::debug!(path = %path.display(), bytes = written, "Wrote archive");

        Ok(())
    }

    /// GET a JSON endpoint relative to the base host.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::request(format!("GET {url}"), e))?;

        let response = check_status(response)?;
        decode_json(response).await
    }
}

/// Rejects non-2xx responses.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Decodes a JSON body, requiring a JSON content type.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.contains("application/json") {
        return Err(AppError::protocol_mismatch(format!(
            "Expected JSON response from {}, got content type {content_type:?}",
            response.url()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::request("Reading response body", e))?;
    serde_json::from_slice(&bytes).map_err(AppError::json_parse)
}

#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFolderItem {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "type", default = "unknown_kind")]
    kind: ItemKind,
    name: String,
}

const fn unknown_kind() -> ItemKind {
    ItemKind::Unknown
}

/// Export status as it appears on the wire, before state validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExportStatus {
    #[serde(rename = "_id")]
    id: String,
    status: String,
    #[serde(default)]
    export_times: Vec<i64>,
    #[serde(default)]
    download_url: Option<String>,
}

impl RawExportStatus {
    /// Validates the wire status string against the documented state set.
    ///
    /// Anything outside it is a protocol mismatch; failing loudly here beats
    /// guessing what an unknown state means mid-export.
    fn validate(self) -> Result<ExportStatus> {
        let state = ExportState::from_wire(&self.status).ok_or_else(|| {
            AppError::protocol_mismatch(format!(
                "Unknown export status {:?} for export job {}",
                self.status, self.id
            ))
        })?;

        Ok(ExportStatus {
            id: self.id,
            state,
            export_times: self.export_times,
            download_url: self.download_url,
        })
    }
}
