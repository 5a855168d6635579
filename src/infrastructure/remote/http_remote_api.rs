use super::classify::{classify_failure, classify_storage_failure, transport_failure};
use crate::application::ports::remote_api::{PresignedUpload, RemoteApi, RemoteError};
use crate::domain::value_objects::{ActionPayload, ActionType, EntityId, ProjectId};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde_json::json;
use std::time::Duration;

/// [`RemoteApi`] against the REST backend.
pub struct HttpRemoteApi {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            AppError::ConfigurationError(format!("invalid API base URL {}: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigurationError(format!(
                "API base URL cannot carry paths: {}",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.endpoint(segments));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.send_classified(request, classify_failure).await
    }

    async fn send_classified(
        &self,
        request: RequestBuilder,
        classify: fn(u16, &str) -> RemoteError,
    ) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport_failure)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = classify(status.as_u16(), &body);
        tracing::debug!(
            target: "offline::remote",
            status = status.as_u16(),
            error = %err,
            "remote request failed"
        );
        Err(err)
    }

    async fn mutate(
        &self,
        segments: &[&str],
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        let request = match action {
            ActionType::Update => self
                .request(Method::PATCH, segments)
                .json(&data.map(ActionPayload::into_inner).unwrap_or_else(|| json!({}))),
            ActionType::Delete => self.request(Method::DELETE, segments),
        };
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn get_presigned_upload_url(
        &self,
        original_name: &str,
        project_id: &ProjectId,
        mime_type: &str,
    ) -> Result<PresignedUpload, RemoteError> {
        let request = self.request(Method::POST, &["uploads", "presign"]).json(&json!({
            "filename": original_name,
            "projectId": project_id.as_str(),
            "contentType": mime_type,
        }));
        let response = self.send(request).await?;
        response
            .json::<PresignedUpload>()
            .await
            .map_err(|err| RemoteError::Permanent(format!("invalid presign response: {err}")))
    }

    async fn upload_binary(
        &self,
        upload_url: &str,
        blob: &[u8],
        mime_type: &str,
    ) -> Result<(), RemoteError> {
        // Presigned URLs carry their own credentials.
        let request = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, mime_type)
            .body(blob.to_vec());
        self.send_classified(request, classify_storage_failure)
            .await
            .map(|_| ())
    }

    async fn trigger_document_analysis(
        &self,
        project_id: &ProjectId,
        stored_filename: &str,
        original_name: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(
                Method::POST,
                &["projects", project_id.as_str(), "documents", "analyze"],
            )
            .json(&json!({
                "storedFilename": stored_filename,
                "originalName": original_name,
            }));
        self.send(request).await.map(|_| ())
    }

    async fn mutate_project(
        &self,
        id: &ProjectId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.mutate(&["projects", id.as_str()], action, data).await
    }

    async fn mutate_column(
        &self,
        id: &EntityId,
        project_id: &ProjectId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.mutate(
            &["projects", project_id.as_str(), "columns", id.as_str()],
            action,
            data,
        )
        .await
    }

    async fn mutate_record(
        &self,
        id: &EntityId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.mutate(&["records", id.as_str()], action, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned response and hands back the raw request text.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base, handle)
    }

    fn api(base_url: String) -> HttpRemoteApi {
        HttpRemoteApi::new(&RemoteConfig {
            base_url,
            auth_token: Some("secret".into()),
            request_timeout: 5,
        })
        .unwrap()
    }

    #[test]
    fn endpoints_are_percent_encoded_under_the_base_path() {
        let api = api("https://example.test/api/".into());
        let url = api.endpoint(&["records", "a b/c"]);
        assert_eq!(url.as_str(), "https://example.test/api/records/a%20b%2Fc");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = HttpRemoteApi::new(&RemoteConfig {
            base_url: "not a url".into(),
            auth_token: None,
            request_timeout: 5,
        });
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn presign_sends_bearer_token_and_parses_response() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 67\r\nconnection: close\r\n\r\n{\"uploadUrl\":\"https://s3.test/put\",\"storedFilename\":\"stored-1.pdf\"}",
        )
        .await;
        let api = api(base);
        let project = ProjectId::new("P1".into()).unwrap();

        let presigned = api
            .get_presigned_upload_url("invoice.pdf", &project, "application/pdf")
            .await
            .unwrap();

        assert_eq!(presigned.upload_url, "https://s3.test/put");
        assert_eq!(presigned.stored_filename, "stored-1.pdf");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/uploads/presign "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains("\"projectId\":\"P1\""));
    }

    #[tokio::test]
    async fn unauthorized_mutation_is_classified() {
        let (base, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 26\r\nconnection: close\r\n\r\n{\"detail\":\"Token expired\"}",
        )
        .await;
        let api = api(base);

        let err = api
            .mutate_record(
                &EntityId::new("r1".into()).unwrap(),
                ActionType::Update,
                Some(ActionPayload::new(json!({"total": 3})).unwrap()),
            )
            .await
            .unwrap_err();

        assert_eq!(err, RemoteError::Unauthorized("Token expired".into()));
        let request = server.await.unwrap();
        assert!(request.starts_with("PATCH /api/records/r1 "));
    }

    #[tokio::test]
    async fn storage_not_found_is_not_a_missing_project() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\ncontent-type: application/xml\r\ncontent-length: 32\r\nconnection: close\r\n\r\n<Error>NoSuchKey</Error>\n       ",
        )
        .await;
        let upload_url = format!("{base}/bucket/a.pdf?signature=abc");

        let err = api(base)
            .upload_binary(&upload_url, b"%PDF-1.7", "application/pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Permanent(ref m) if m.contains("NoSuchKey")));
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /api/bucket/a.pdf?signature=abc "));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        drop(listener);

        let err = api(base)
            .mutate_project(&ProjectId::new("P1".into()).unwrap(), ActionType::Delete, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Transient(_)));
    }
}
