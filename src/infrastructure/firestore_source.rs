//! Firestore REST source
//!
//! Pages through `documents.list` for one collection and flattens the typed
//! field values Firestore returns into plain JSON, so the normalizer sees the
//! same shape as an export file.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::domain::repositories::{ProductSource, SourceError, SourceRecord, SourceResult};
use crate::infrastructure::config::FirestoreConfig;

const USER_AGENT: &str = concat!("poster-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct FirestoreSource {
    client: reqwest::Client,
    collection_url: Url,
    page_size: u32,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl FirestoreSource {
    pub fn new(config: &FirestoreConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| SourceError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            collection_url: collection_url(&config.base_url, &config.project_id, &config.collection)?,
            page_size: config.page_size,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub const fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    fn page_url(&self, page_token: Option<&str>) -> Url {
        let mut url = self.collection_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
            if let Some(key) = &self.api_key {
                query.append_pair("key", key);
            }
        }
        url
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> SourceResult<ListDocumentsResponse> {
        let mut request = self.client.get(self.page_url(page_token));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProductSource for FirestoreSource {
    async fn list_all(&self) -> SourceResult<Vec<SourceRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            pages += 1;
            debug!(page = pages, documents = page.documents.len(), "fetched firestore page");

            records.extend(page.documents.into_iter().map(into_record));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    return Err(SourceError::InvalidExport(format!(
                        "firestore returned the same page token twice: {next}"
                    )));
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        info!(
            collection = %self.collection_url,
            documents = records.len(),
            pages,
            "listed firestore collection"
        );
        Ok(records)
    }
}

fn collection_url(base_url: &str, project_id: &str, collection: &str) -> SourceResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| SourceError::Configuration(format!("invalid base url '{base_url}': {e}")))?;

    url.path_segments_mut()
        .map_err(|()| SourceError::Configuration(format!("base url '{base_url}' cannot be a base")))?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", "(default)", "documents"])
        .extend(collection.split('/').filter(|s| !s.is_empty()));
    Ok(url)
}

fn into_record(document: Document) -> SourceRecord {
    let identifier = document_id(&document.name).to_string();
    SourceRecord::new(identifier, Value::Object(decode_fields(document.fields)))
}

/// Last path segment of a document resource name
#[must_use]
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[must_use]
pub fn decode_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key, decode_value(value)))
        .collect()
}

/// Converts one Firestore typed value (`{"stringValue": "x"}` and friends)
/// into plain JSON. Unknown shapes pass through unchanged.
#[must_use]
pub fn decode_value(value: Value) -> Value {
    let Value::Object(typed) = value else {
        return value;
    };
    if typed.len() != 1 {
        return Value::Object(typed);
    }
    let Some((kind, inner)) = typed.into_iter().next() else {
        return Value::Null;
    };

    match (kind.as_str(), inner) {
        ("nullValue", _) => Value::Null,
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map_or(Value::String(s), Value::from),
        ("doubleValue", Value::String(s)) => match s.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        (
            "stringValue" | "integerValue" | "doubleValue" | "booleanValue" | "timestampValue"
            | "referenceValue" | "bytesValue" | "geoPointValue",
            inner,
        ) => inner,
        ("mapValue", Value::Object(mut map)) => match map.remove("fields") {
            Some(Value::Object(fields)) => Value::Object(decode_fields(fields)),
            _ => Value::Object(Map::new()),
        },
        ("arrayValue", Value::Object(mut array)) => match array.remove("values") {
            Some(Value::Array(values)) => {
                Value::Array(values.into_iter().map(decode_value).collect())
            }
            _ => Value::Array(Vec::new()),
        },
        (other, inner) => {
            let mut passthrough = Map::new();
            passthrough.insert(other.to_string(), inner);
            Value::Object(passthrough)
        }
    }
}
