use crate::api::DocumentStore;
use crate::api::firestore::{Document, encode_fields, encode_value};
use crate::error::QueryError;
use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Client as HttpClient;
use serde_json::{Map, Value, json};
use url::Url;

const PAGE_SIZE: u32 = 300;
const ID_LEN: usize = 20;

/// Document store client over the REST surface.
pub struct FirestoreClient {
    pub http: HttpClient,
    /// `{base}/projects/{project}/databases/(default)/documents`
    documents_url: String,
    /// `projects/{project}/databases/(default)/documents`, used in write payloads.
    documents_path: String,
}

impl FirestoreClient {
    pub fn new(base_url: &str, project_id: &str) -> Self {
        Self::with_http(HttpClient::new(), base_url, project_id)
    }

    pub fn with_http(http: HttpClient, base_url: &str, project_id: &str) -> Self {
        let documents_path = format!("projects/{project_id}/databases/(default)/documents");
        let base = base_url.trim_end_matches('/');
        let base = if base.ends_with("/v1") { base.to_string() } else { format!("{base}/v1") };
        Self { http, documents_url: format!("{base}/{documents_path}"), documents_path }
    }

    fn with_auth(mut req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        req
    }

    fn collection_url(&self, collection: &str) -> Result<Url, QueryError> {
        Url::parse(&format!("{}/{}", self.documents_url, collection)).map_err(|e| QueryError::Decode(e.to_string()))
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, QueryError> {
        Url::parse(&format!("{}/{}/{}", self.documents_url, collection, id)).map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// Document URL for a PATCH. With a mask, only the listed field paths are written.
    pub fn patch_url(&self, collection: &str, id: &str, mask: Option<&Map<String, Value>>) -> Result<Url, QueryError> {
        let mut url = self.document_url(collection, id)?;
        if let Some(fields) = mask {
            let mut q = url.query_pairs_mut();
            for key in fields.keys() {
                q.append_pair("updateMask.fieldPaths", key);
            }
        }
        Ok(url)
    }

    async fn patch(&self, url: Url, fields: &Map<String, Value>, token: Option<&str>) -> Result<(), QueryError> {
        let body = json!({ "fields": encode_fields(fields) });
        Self::send(Self::with_auth(self.http.patch(url).json(&body), token)).await?;
        Ok(())
    }

    fn new_id() -> String {
        rand::rng().sample_iter(&Alphanumeric).take(ID_LEN).map(char::from).collect()
    }

    async fn send(req: reqwest::RequestBuilder) -> Result<Value, QueryError> {
        let resp = req.send().await.map_err(|e| QueryError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryError::Status { status: status.as_u16(), body });
        }
        resp.json::<Value>().await.map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// Body for an exact-match structured query.
    pub fn equality_query(collection: &str, field: &str, value: &Value) -> Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(value)
                    }
                }
            }
        })
    }

    /// Body for a create that stamps `server_time_field` with the request time.
    pub fn create_write(&self, collection: &str, id: &str, fields: &Map<String, Value>, server_time_field: Option<&str>) -> Value {
        let mut write = json!({
            "update": {
                "name": format!("{}/{}/{}", self.documents_path, collection, id),
                "fields": encode_fields(fields)
            },
            "currentDocument": { "exists": false }
        });
        if let Some(field) = server_time_field {
            write["updateTransforms"] = json!([{ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }]);
        }
        json!({ "writes": [write] })
    }
}

/// Documents from a `runQuery` response; entries without a document are skipped.
pub fn parse_query_response(json: &Value) -> Result<Vec<Document>, QueryError> {
    let rows = json.as_array().ok_or_else(|| QueryError::Decode("query response is not an array".into()))?;
    rows.iter()
        .filter_map(|row| row.get("document"))
        .map(Document::from_resource)
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list(&self, collection: &str, token: Option<&str>) -> Result<Vec<Document>, QueryError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.collection_url(collection)?;
            {
                let mut q = url.query_pairs_mut();
                q.append_pair("pageSize", &PAGE_SIZE.to_string());
                if let Some(t) = page_token.as_deref() {
                    q.append_pair("pageToken", t);
                }
            }
            let json = Self::send(Self::with_auth(self.http.get(url), token)).await?;
            if let Some(docs) = json.get("documents").and_then(Value::as_array) {
                for d in docs {
                    out.push(Document::from_resource(d)?);
                }
            }
            page_token = json.get("nextPageToken").and_then(Value::as_str).map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }
        log::debug!("listed {} documents from {collection}", out.len());
        Ok(out)
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value, token: Option<&str>) -> Result<Vec<Document>, QueryError> {
        let endpoint = format!("{}:runQuery", self.documents_url);
        let body = Self::equality_query(collection, field, value);
        let json = Self::send(Self::with_auth(self.http.post(&endpoint).json(&body), token)).await?;
        parse_query_response(&json)
    }

    async fn get(&self, collection: &str, id: &str, token: Option<&str>) -> Result<Option<Document>, QueryError> {
        let url = self.document_url(collection, id)?;
        match Self::send(Self::with_auth(self.http.get(url), token)).await {
            Ok(json) => Document::from_resource(&json).map(Some),
            Err(QueryError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn add(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        server_time_field: Option<&str>,
        token: Option<&str>,
    ) -> Result<String, QueryError> {
        let id = Self::new_id();
        let endpoint = format!("{}:commit", self.documents_url);
        let body = self.create_write(collection, &id, &fields, server_time_field);
        Self::send(Self::with_auth(self.http.post(&endpoint).json(&body), token)).await?;
        Ok(id)
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), QueryError> {
        let url = self.patch_url(collection, id, Some(&fields))?;
        self.patch(url, &fields, token).await
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        token: Option<&str>,
    ) -> Result<(), QueryError> {
        let url = self.patch_url(collection, id, None)?;
        self.patch(url, &fields, token).await
    }
}
