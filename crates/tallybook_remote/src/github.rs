//! GitHub contents API client
//!
//! Implements [`DocumentStore`] against a repository file:
//! - raw reads go to the public raw host, unauthenticated
//! - metadata reads and writes go to `/repos/{owner}/{repo}/contents/{path}`
//!   with `Authorization: token <credential>`
//!
//! The contents API rejects a PUT whose `sha` is not the file's current blob
//! SHA (409), and a PUT without `sha` on an existing file (422). Both surface
//! as [`RemoteError::Conflict`].

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::credentials::SecretProvider;
use crate::document::{DocumentLocation, DocumentStore, Revision, Snapshot};
use crate::error::RemoteError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("tallybook/", env!("CARGO_PKG_VERSION"));

/// Base URLs for the API and raw hosts (override for GitHub Enterprise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubEndpoints {
    pub api_base: String,
    pub raw_base: String,
}

impl Default for GithubEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
        }
    }
}

/// Metadata returned by `GET /contents/{path}`.
#[derive(Debug, Deserialize)]
struct ContentsMetadata {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

pub struct GithubContentsClient<T> {
    transport: T,
    secrets: Arc<dyn SecretProvider>,
    endpoints: GithubEndpoints,
}

impl<T: HttpTransport> GithubContentsClient<T> {
    pub fn new(transport: T, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            transport,
            secrets,
            endpoints: GithubEndpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GithubEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// `{raw_base}/{owner}/{repo}/{branch}/{path}`
    pub fn raw_url(&self, location: &DocumentLocation) -> Result<String, RemoteError> {
        let mut segments = vec![
            location.owner.as_str(),
            location.repo.as_str(),
            location.branch.as_str(),
        ];
        segments.extend(location.path_segments());
        Ok(join_url(&self.endpoints.raw_base, &segments)?.into())
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}`
    pub fn contents_url(&self, location: &DocumentLocation) -> Result<String, RemoteError> {
        let mut segments = vec![
            "repos",
            location.owner.as_str(),
            location.repo.as_str(),
            "contents",
        ];
        segments.extend(location.path_segments());
        Ok(join_url(&self.endpoints.api_base, &segments)?.into())
    }

    fn metadata_url(&self, location: &DocumentLocation) -> Result<String, RemoteError> {
        let mut url = Url::parse(&self.contents_url(location)?)
            .map_err(|e| RemoteError::InvalidLocation(e.to_string()))?;
        url.query_pairs_mut().append_pair("ref", &location.branch);
        Ok(url.into())
    }

    fn authorized(&self, request: HttpRequest) -> Result<HttpRequest, RemoteError> {
        let credentials = self.secrets.credentials()?;
        Ok(request
            .header("Accept", ACCEPT)
            .header("Authorization", credentials.authorization_header()))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let request = request.header("User-Agent", USER_AGENT);
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        debug!(?method, %url, status = response.status, "GitHub request completed");
        Ok(response)
    }

    async fn fetch_metadata(
        &self,
        location: &DocumentLocation,
    ) -> Result<Option<ContentsMetadata>, RemoteError> {
        let url = self.metadata_url(location)?;
        let response = self.send(self.authorized(HttpRequest::get(&url))?).await?;

        if response.status == 404 {
            debug!("No document at {}", location);
            return Ok(None);
        }
        if !response.is_success() {
            return Err(http_error(&url, response));
        }

        let metadata: ContentsMetadata = response.json().map_err(|e| {
            RemoteError::invalid_response(&url, format!("expected file metadata: {}", e))
        })?;
        Ok(Some(metadata))
    }
}

#[async_trait]
impl<T: HttpTransport> DocumentStore for GithubContentsClient<T> {
    async fn fetch_raw(&self, location: &DocumentLocation) -> Result<Option<String>, RemoteError> {
        let url = self.raw_url(location)?;
        let response = self.send(HttpRequest::get(&url)).await?;

        if response.status == 404 {
            debug!("Raw read found no document at {}", location);
            return Ok(None);
        }
        if !response.is_success() {
            return Err(http_error(&url, response));
        }

        Ok(Some(response.body))
    }

    async fn fetch_revision(
        &self,
        location: &DocumentLocation,
    ) -> Result<Option<Revision>, RemoteError> {
        let metadata = self.fetch_metadata(location).await?;
        Ok(metadata.map(|m| Revision::new(m.sha)))
    }

    async fn write(
        &self,
        location: &DocumentLocation,
        content: &str,
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError> {
        let url = self.contents_url(location)?;
        let body = WriteRequest {
            message,
            content: general_purpose::STANDARD.encode(content.as_bytes()),
            sha: revision.map(Revision::as_str),
            branch: &location.branch,
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| RemoteError::invalid_response(&url, e.to_string()))?;

        let response = self
            .send(self.authorized(HttpRequest::put_json(&url, body))?)
            .await?;

        if is_conflict(&response) {
            warn!(
                "Write to {} rejected: revision {:?} is no longer current",
                location,
                revision.map(Revision::as_str)
            );
            return Err(RemoteError::Conflict {
                path: location.path.clone(),
                expected: revision.cloned(),
            });
        }
        if !response.is_success() {
            return Err(http_error(&url, response));
        }

        let written: WriteResponse = response.json().map_err(|e| {
            RemoteError::invalid_response(&url, format!("expected commit response: {}", e))
        })?;
        let revision = Revision::new(written.content.sha);
        info!("Committed {} at revision {}", location, revision);
        Ok(revision)
    }

    /// One authenticated contents call yields both the content and its SHA.
    async fn fetch_snapshot(&self, location: &DocumentLocation) -> Result<Snapshot, RemoteError> {
        let Some(metadata) = self.fetch_metadata(location).await? else {
            return Ok(Snapshot {
                content: String::new(),
                revision: None,
            });
        };

        let revision = Revision::new(metadata.sha);
        match (metadata.encoding.as_deref(), metadata.content) {
            (Some("base64"), Some(encoded)) => {
                let content = decode_content(&encoded).map_err(|message| {
                    RemoteError::invalid_response(location.to_string(), message)
                })?;
                Ok(Snapshot {
                    content,
                    revision: Some(revision),
                })
            }
            (encoding, _) => {
                // Files over 1 MB come back with encoding "none" and no content.
                warn!(
                    "Contents API returned no inline content for {} (encoding {:?}); falling back to raw read",
                    location, encoding
                );
                match self.fetch_raw(location).await? {
                    Some(content) => Ok(Snapshot {
                        content,
                        revision: Some(revision),
                    }),
                    None => Err(RemoteError::MissingContent {
                        path: location.path.clone(),
                        revision,
                    }),
                }
            }
        }
    }
}

fn join_url(base: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(base).map_err(|e| RemoteError::InvalidLocation(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::InvalidLocation(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// 409 is a stale `sha`; 422 is a conflict only when GitHub names the `sha`
/// field (`"sha" wasn't supplied` on a create over an existing file).
fn is_conflict(response: &HttpResponse) -> bool {
    match response.status {
        409 => true,
        422 => response
            .json::<ErrorBody>()
            .map(|body| body.message.contains("\"sha\""))
            .unwrap_or(false),
        _ => false,
    }
}

fn http_error(url: &str, response: HttpResponse) -> RemoteError {
    RemoteError::Http {
        status: response.status,
        url: url.to_string(),
        body: response.body,
    }
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(encoded: &str) -> Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("content is not valid base64: {}", e))?;
    String::from_utf8(bytes).map_err(|e| format!("content is not UTF-8: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticSecretProvider;
    use crate::error::TransportError;
    use crate::transport::HttpMethod;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued responses and records every request.
    #[derive(Clone, Default)]
    struct RecordingTransport {
        responses: Arc<Mutex<VecDeque<Result<HttpResponse, String>>>>,
        requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl RecordingTransport {
        fn respond(&self, status: u16, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse::new(status, body)));
        }

        fn fail(&self, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = request.url.clone();
            self.requests.lock().unwrap().push(request);
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(TransportError::Request { url, message }),
                None => panic!("no response queued for {}", url),
            }
        }
    }

    fn client(transport: &RecordingTransport) -> GithubContentsClient<RecordingTransport> {
        GithubContentsClient::new(
            transport.clone(),
            Arc::new(StaticSecretProvider::new("ghp_test")),
        )
    }

    fn location() -> DocumentLocation {
        DocumentLocation::new("dansklee", "travel_budget_tracker", "data/budget_data.csv")
    }

    #[test]
    fn test_urls() {
        let transport = RecordingTransport::default();
        let client = client(&transport);
        assert_eq!(
            client.raw_url(&location()).unwrap(),
            "https://raw.githubusercontent.com/dansklee/travel_budget_tracker/main/data/budget_data.csv"
        );
        assert_eq!(
            client.contents_url(&location()).unwrap(),
            "https://api.github.com/repos/dansklee/travel_budget_tracker/contents/data/budget_data.csv"
        );
        assert_eq!(
            client.metadata_url(&location()).unwrap(),
            "https://api.github.com/repos/dansklee/travel_budget_tracker/contents/data/budget_data.csv?ref=main"
        );
    }

    #[test]
    fn test_url_segments_are_percent_encoded() {
        let transport = RecordingTransport::default();
        let client = client(&transport);
        let location = DocumentLocation::new("o", "r", "my data/budget.csv");
        assert_eq!(
            client.raw_url(&location).unwrap(),
            "https://raw.githubusercontent.com/o/r/main/my%20data/budget.csv"
        );
    }

    #[test]
    fn test_enterprise_endpoints_keep_base_path() {
        let transport = RecordingTransport::default();
        let client = client(&transport).with_endpoints(GithubEndpoints {
            api_base: "https://ghe.example.com/api/v3".to_string(),
            raw_base: "https://ghe.example.com/raw".to_string(),
        });
        assert_eq!(
            client.contents_url(&location()).unwrap(),
            "https://ghe.example.com/api/v3/repos/dansklee/travel_budget_tracker/contents/data/budget_data.csv"
        );
    }

    #[tokio::test]
    async fn test_fetch_raw_is_unauthenticated() {
        let transport = RecordingTransport::default();
        transport.respond(200, "Date,Description\n2024-01-01,Lunch");

        let content = client(&transport).fetch_raw(&location()).await.unwrap();
        assert_eq!(content.as_deref(), Some("Date,Description\n2024-01-01,Lunch"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].header_value("authorization"), None);
        assert!(requests[0].header_value("user-agent").is_some());
    }

    #[tokio::test]
    async fn test_fetch_raw_missing_document_is_none() {
        let transport = RecordingTransport::default();
        transport.respond(404, "404: Not Found");
        let content = client(&transport).fetch_raw(&location()).await.unwrap();
        assert_eq!(content, None);
    }

    #[tokio::test]
    async fn test_fetch_raw_empty_document_is_not_missing() {
        let transport = RecordingTransport::default();
        transport.respond(200, "");
        let content = client(&transport).fetch_raw(&location()).await.unwrap();
        assert_eq!(content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_fetch_raw_server_error() {
        let transport = RecordingTransport::default();
        transport.respond(503, "unavailable");
        let err = client(&transport).fetch_raw(&location()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_raw_transport_failure() {
        let transport = RecordingTransport::default();
        transport.fail("connection reset");
        let err = client(&transport).fetch_raw(&location()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_revision_sends_token_and_accept() {
        let transport = RecordingTransport::default();
        transport.respond(200, r#"{"sha":"abc123","name":"budget_data.csv"}"#);

        let revision = client(&transport).fetch_revision(&location()).await.unwrap();
        assert_eq!(revision, Some(Revision::new("abc123")));

        let request = &transport.requests()[0];
        assert_eq!(request.header_value("authorization"), Some("token ghp_test"));
        assert_eq!(request.header_value("accept"), Some(ACCEPT));
        assert!(request.url.ends_with("?ref=main"));
    }

    #[tokio::test]
    async fn test_fetch_revision_missing_document() {
        let transport = RecordingTransport::default();
        transport.respond(404, r#"{"message":"Not Found"}"#);
        let revision = client(&transport).fetch_revision(&location()).await.unwrap();
        assert_eq!(revision, None);
    }

    #[tokio::test]
    async fn test_fetch_revision_rejects_directory_listing() {
        let transport = RecordingTransport::default();
        transport.respond(200, r#"[{"sha":"a"},{"sha":"b"}]"#);
        let err = client(&transport).fetch_revision(&location()).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_write_update_payload() {
        let transport = RecordingTransport::default();
        transport.respond(200, r#"{"content":{"sha":"def456"},"commit":{"sha":"c0ffee"}}"#);

        let revision = client(&transport)
            .write(
                &location(),
                "Date,Description\n2024-01-01,Lunch",
                Some(&Revision::new("abc123")),
                "Update travel budget - 2024-01-02T00:00:00Z",
            )
            .await
            .unwrap();
        assert_eq!(revision, Revision::new("def456"));

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.header_value("authorization"), Some("token ghp_test"));
        assert_eq!(request.header_value("content-type"), Some("application/json"));

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["sha"], "abc123");
        assert_eq!(body["branch"], "main");
        assert_eq!(body["message"], "Update travel budget - 2024-01-02T00:00:00Z");
        assert_eq!(
            body["content"],
            general_purpose::STANDARD.encode("Date,Description\n2024-01-01,Lunch")
        );
    }

    #[tokio::test]
    async fn test_write_create_omits_sha() {
        let transport = RecordingTransport::default();
        transport.respond(201, r#"{"content":{"sha":"new1"}}"#);

        client(&transport)
            .write(&location(), "a,b\n1,2", None, "create")
            .await
            .unwrap();

        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn test_write_stale_revision_is_conflict() {
        let transport = RecordingTransport::default();
        transport.respond(409, r#"{"message":"data/budget_data.csv does not match abc123"}"#);

        let err = client(&transport)
            .write(&location(), "x", Some(&Revision::new("abc123")), "m")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_write_missing_sha_is_conflict() {
        let transport = RecordingTransport::default();
        transport.respond(422, r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#);

        let err = client(&transport)
            .write(&location(), "x", None, "m")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_write_other_validation_error_is_http() {
        let transport = RecordingTransport::default();
        transport.respond(422, r#"{"message":"Invalid request. content is not valid"}"#);

        let err = client(&transport)
            .write(&location(), "x", None, "m")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_write_validation_error_mentioning_sha_elsewhere_is_http() {
        let transport = RecordingTransport::default();
        transport.respond(
            422,
            r#"{"message":"Invalid request.\n\n\"content\" is not valid: sha256 digest mismatch"}"#,
        );

        let err = client(&transport)
            .write(&location(), "x", None, "m")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_write_unparseable_422_is_http() {
        let transport = RecordingTransport::default();
        transport.respond(422, "sha");

        let err = client(&transport)
            .write(&location(), "x", None, "m")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_snapshot_single_request() {
        let transport = RecordingTransport::default();
        let encoded = general_purpose::STANDARD.encode("Date,Description\n2024-01-01,Lunch");
        let wrapped = format!("{}\n{}\n", &encoded[..20], &encoded[20..]);
        transport.respond(
            200,
            &serde_json::json!({"sha": "abc123", "encoding": "base64", "content": wrapped})
                .to_string(),
        );

        let snapshot = client(&transport).fetch_snapshot(&location()).await.unwrap();
        assert_eq!(snapshot.content, "Date,Description\n2024-01-01,Lunch");
        assert_eq!(snapshot.revision, Some(Revision::new("abc123")));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_missing_document() {
        let transport = RecordingTransport::default();
        transport.respond(404, "{}");
        let snapshot = client(&transport).fetch_snapshot(&location()).await.unwrap();
        assert_eq!(snapshot.content, "");
        assert_eq!(snapshot.revision, None);
    }

    #[tokio::test]
    async fn test_snapshot_large_file_falls_back_to_raw() {
        let transport = RecordingTransport::default();
        transport.respond(200, r#"{"sha":"big1","encoding":"none","content":""}"#);
        transport.respond(200, "a,b\n1,2");

        let snapshot = client(&transport).fetch_snapshot(&location()).await.unwrap();
        assert_eq!(snapshot.content, "a,b\n1,2");
        assert_eq!(snapshot.revision, Some(Revision::new("big1")));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].header_value("authorization"), None);
    }

    #[tokio::test]
    async fn test_snapshot_large_file_with_unreadable_raw_is_error() {
        let transport = RecordingTransport::default();
        transport.respond(200, r#"{"sha":"big1","encoding":"none","content":""}"#);
        transport.respond(404, "404: Not Found");

        let err = client(&transport).fetch_snapshot(&location()).await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::MissingContent { ref revision, .. } if revision.as_str() == "big1"
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_sending() {
        let transport = RecordingTransport::default();
        let client = GithubContentsClient::new(
            transport.clone(),
            Arc::new(crate::credentials::EnvSecretProvider::new(
                "TALLYBOOK_TEST_TOKEN_THAT_IS_NEVER_SET",
            )),
        );

        let err = client.fetch_revision(&location()).await.unwrap_err();
        assert!(matches!(err, RemoteError::Credentials(_)));
        assert!(transport.requests().is_empty());
    }
}
