use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{ItemKind, NoteStore, ResourceMetadata, Result, StoreError, StoreItem};
use crate::qnap::Timestamps;

/// Client for the Joplin Data API (Web Clipper service)
pub struct JoplinClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// One page of a list or search response
#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

impl JoplinClient {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StoreError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Build full URL for an API path
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.query(&[("token", token.as_str())]),
            None => request,
        }
    }

    async fn check(path: &str, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::AuthFailed),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            status if !status.is_success() => Err(StoreError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        let response = Self::check(path, request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_raw(&self, path: &str, body: &Value) -> Result<Response> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        Self::check(path, request.send().await?).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        Ok(self.post_raw(path, body).await?.json().await?)
    }

    /// Check that the clipper service answers
    pub async fn ping(&self) -> Result<bool> {
        let response = self.client.get(self.url("ping")).send().await?;
        let response = Self::check("ping", response).await?;
        Ok(response.text().await?.contains("JoplinClipperServer"))
    }
}

/// Body of a folder or note creation, with the source timestamps in epoch
/// milliseconds
fn item_body(fields: Value, times: Timestamps) -> Value {
    let mut body = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(created) = times.created {
        body.insert(
            "user_created_time".to_string(),
            json!(created.timestamp_millis()),
        );
    }
    if let Some(updated) = times.updated {
        body.insert(
            "user_updated_time".to_string(),
            json!(updated.timestamp_millis()),
        );
    }
    Value::Object(body)
}

#[async_trait]
impl NoteStore for JoplinClient {
    async fn create_folder(
        &self,
        parent_id: &str,
        title: &str,
        times: Timestamps,
    ) -> Result<StoreItem> {
        let body = item_body(json!({ "title": title, "parent_id": parent_id }), times);
        self.post("folders", &body).await
    }

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: Timestamps,
    ) -> Result<StoreItem> {
        let body = item_body(
            json!({ "title": title, "body": body, "parent_id": parent_id }),
            times,
        );
        self.post("notes", &body).await
    }

    async fn create_tag(&self, name: &str) -> Result<StoreItem> {
        self.post("tags", &json!({ "title": name })).await
    }

    async fn attach_tag(&self, note_id: &str, tag_id: &str) -> Result<()> {
        let path = format!("tags/{}/notes", tag_id);
        self.post_raw(&path, &json!({ "id": note_id })).await?;
        Ok(())
    }

    async fn search(&self, query: &str, kind: ItemKind) -> Result<Vec<StoreItem>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let response: Paginated<StoreItem> = self
                .get(
                    "search",
                    &[
                        ("query", query.to_string()),
                        ("type", kind.as_str().to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            items.extend(response.items);

            if !response.has_more {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    async fn get_resource_metadata(&self, id: &str) -> Result<ResourceMetadata> {
        let path = format!("resources/{}", id);
        self.get(&path, &[("fields", "id,size".to_string())]).await
    }

    async fn create_resource(&self, title: &str, file: &Path) -> Result<StoreItem> {
        let data = tokio::fs::read(file).await?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| title.to_string());

        let form = Form::new()
            .part("data", Part::bytes(data).file_name(filename))
            .text("props", json!({ "title": title }).to_string());

        let request = self.authorize(self.client.post(self.url("resources")).multipart(form));
        let response = Self::check("resources", request.send().await?).await?;
        Ok(response.json().await?)
    }
}
