//! Transport implementation on top of `reqwest`.

use async_trait::async_trait;
use branchline_core::transport::{HttpRequest, HttpResponse, RequestBody, Transport};
use branchline_core::{BranchlineError, Result};
use branchline_infrastructure::ResolvedConfig;
use reqwest::header::{COOKIE, HeaderValue};
use reqwest::{Client, RequestBuilder, Url, multipart};
use std::time::Duration;

/// Sends requests over HTTP, authenticating with the session cookie.
///
/// The cookie only goes to the service's own origin. Requests to any other
/// host, such as file downloads from a CDN, are sent without it.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    service_url: Url,
    session_key: Option<String>,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, session_key: Option<String>, timeout: Duration) -> Result<Self> {
        let service_url = Url::parse(base_url)
            .map_err(|err| BranchlineError::config(format!("Invalid base URL '{base_url}': {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BranchlineError::internal(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            service_url,
            session_key,
        })
    }

    /// Transport authenticated with the configured session key.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        Self::new(
            &config.config.remote.base_url,
            Some(config.session_key()?.to_string()),
            config.config.remote.request_timeout(),
        )
    }

    fn is_service_origin(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|url| url.origin() == self.service_url.origin())
    }

    fn build(&self, request: HttpRequest) -> Result<RequestBuilder> {
        let send_cookie = self.is_service_origin(&request.url);
        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);

        if let Some(key) = &self.session_key
            && send_cookie
        {
            let cookie = HeaderValue::from_str(&format!("sessionKey={key}"))
                .map_err(|err| BranchlineError::config(format!("Invalid session key: {err}")))?;
            builder = builder.header(COOKIE, cookie);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart {
                field_name,
                file_name,
                content_type,
                bytes,
            } => {
                let part = multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|err| {
                        BranchlineError::internal(format!("Invalid content type '{content_type}': {err}"))
                    })?;
                builder.multipart(multipart::Form::new().part(field_name, part))
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();

        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|err| BranchlineError::network(None, format!("{method} {url} failed: {err}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| {
                BranchlineError::network(Some(status.as_u16()), format!("Failed to read body of {url}: {err}"))
            })?
            .to_vec();

        tracing::trace!(%method, %url, status = status.as_u16(), bytes = body.len(), "HTTP call finished");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteClient;
    use branchline_core::conversation::ConversationApi;
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Builds every request with the real transport and records its cookie
    /// instead of sending it.
    struct CookieRecorder {
        inner: ReqwestTransport,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl Transport for CookieRecorder {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            let url = request.url.clone();
            let built = self.inner.build(request)?.build().unwrap();
            let cookie = built
                .headers()
                .get(COOKIE)
                .map(|v| v.to_str().unwrap().to_string());
            self.seen.lock().unwrap().push((url, cookie));
            Ok(HttpResponse::new(StatusCode::OK, "bytes"))
        }
    }

    fn transport(session_key: Option<&str>) -> ReqwestTransport {
        ReqwestTransport::new(
            "https://example.test",
            session_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn cookie_of(transport: &ReqwestTransport, url: &str) -> Option<String> {
        let built = transport.build(HttpRequest::get(url)).unwrap().build().unwrap();
        built
            .headers()
            .get(COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn test_json_request_carries_cookie_and_body() {
        let request = HttpRequest::post_json("https://example.test/api/x", &json!({"a": 1})).unwrap();
        let built = transport(Some("sk-1")).build(request).unwrap().build().unwrap();

        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.url().as_str(), "https://example.test/api/x");
        assert_eq!(built.headers()[COOKIE], "sessionKey=sk-1");
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(br#"{"a":1}"#.as_slice())
        );
    }

    #[test]
    fn test_anonymous_request_has_no_cookie() {
        let built = transport(None)
            .build(HttpRequest::get("https://example.test/file"))
            .unwrap()
            .build()
            .unwrap();
        assert!(built.headers().get(COOKIE).is_none());
        assert!(built.body().is_none());
    }

    #[test]
    fn test_multipart_request_sets_form_content_type() {
        let request = HttpRequest::new(Method::POST, "https://example.test/upload").with_multipart(
            "file",
            "a.png",
            "image/png",
            vec![1, 2, 3],
        );
        let built = transport(Some("sk")).build(request).unwrap().build().unwrap();

        let content_type = built.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[test]
    fn test_cookie_stays_on_service_origin() {
        let transport = transport(Some("sk-secret"));

        assert_eq!(
            cookie_of(&transport, "https://example.test/api/files/f/preview").as_deref(),
            Some("sessionKey=sk-secret")
        );
        assert_eq!(
            cookie_of(&transport, "https://example.test:443/x").as_deref(),
            Some("sessionKey=sk-secret")
        );
        assert_eq!(cookie_of(&transport, "https://cdn.third-party.test/f.png"), None);
        assert_eq!(cookie_of(&transport, "http://example.test/x"), None);
        assert_eq!(cookie_of(&transport, "https://files.example.test/x"), None);
    }

    #[tokio::test]
    async fn test_download_from_foreign_host_carries_no_cookie() {
        let recorder = Arc::new(CookieRecorder {
            inner: transport(Some("sk-secret")),
            seen: Mutex::new(Vec::new()),
        });
        let client = RemoteClient::new("https://example.test", "org", recorder.clone());

        client
            .download_file("https://cdn.third-party.test/f.png")
            .await
            .unwrap();
        client.download_file("/api/files/f/preview").await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            [
                ("https://cdn.third-party.test/f.png".to_string(), None),
                (
                    "https://example.test/api/files/f/preview".to_string(),
                    Some("sessionKey=sk-secret".to_string())
                ),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = ReqwestTransport::new("not a url", None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, BranchlineError::Config(_)));
    }

    #[test]
    fn test_invalid_session_key_is_config_error() {
        let err = transport(Some("bad\nkey"))
            .build(HttpRequest::get("https://example.test"))
            .unwrap_err();
        assert!(matches!(err, BranchlineError::Config(_)));
    }
}
