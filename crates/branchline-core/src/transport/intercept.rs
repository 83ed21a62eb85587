//! Interception chain around a [`Transport`].

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A predicate-plus-transform pair applied to calls passing through an
/// [`InterceptingTransport`].
///
/// `matches` decides on the original request alone (URL shape and method).
/// `on_request` runs before the call is issued; `on_response` runs only for
/// successful responses. Both default to passing their input through.
#[async_trait]
pub trait InterceptRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn matches(&self, request: &HttpRequest) -> bool;

    async fn on_request(&self, request: HttpRequest) -> Result<HttpRequest> {
        Ok(request)
    }

    async fn on_response(
        &self,
        _request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse> {
        Ok(response)
    }
}

/// A [`Transport`] that runs every call through an ordered list of rules.
///
/// Request transforms run in registration order before the wrapped transport
/// is called; response transforms run in the same order afterwards. Errors of
/// the wrapped transport and non-success responses are returned untouched.
/// Nothing is cached between calls.
pub struct InterceptingTransport {
    inner: Arc<dyn Transport>,
    rules: Vec<Arc<dyn InterceptRule>>,
}

impl InterceptingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            rules: Vec::new(),
        }
    }

    /// Appends a rule to the end of the chain.
    pub fn with_rule(mut self, rule: Arc<dyn InterceptRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

#[async_trait]
impl Transport for InterceptingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let matched: Vec<&Arc<dyn InterceptRule>> =
            self.rules.iter().filter(|r| r.matches(&request)).collect();

        if matched.is_empty() {
            return self.inner.send(request).await;
        }

        let mut request = request;
        for rule in &matched {
            tracing::trace!(rule = rule.name(), url = %request.url, "Rewriting request");
            request = rule.on_request(request).await?;
        }

        let sent = request.clone();
        let mut response = self.inner.send(request).await?;
        if !response.is_success() {
            return Ok(response);
        }

        for rule in &matched {
            tracing::trace!(rule = rule.name(), url = %sent.url, "Rewriting response");
            response = rule.on_response(&sent, response).await?;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BranchlineError;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed status.
    struct Recorder {
        seen: Mutex<Vec<String>>,
        status: StatusCode,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request.url.clone());
            Ok(HttpResponse::new(self.status, "body"))
        }
    }

    struct Failing;

    #[async_trait]
    impl Transport for Failing {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Err(BranchlineError::network(None, "connection refused"))
        }
    }

    /// Appends a suffix to URLs and bodies it matches.
    struct Suffix(&'static str);

    #[async_trait]
    impl InterceptRule for Suffix {
        fn name(&self) -> &'static str {
            "suffix"
        }

        fn matches(&self, request: &HttpRequest) -> bool {
            request.url.starts_with("/match")
        }

        async fn on_request(&self, mut request: HttpRequest) -> Result<HttpRequest> {
            request.url.push_str(self.0);
            Ok(request)
        }

        async fn on_response(
            &self,
            _request: &HttpRequest,
            mut response: HttpResponse,
        ) -> Result<HttpResponse> {
            response.body.extend_from_slice(self.0.as_bytes());
            Ok(response)
        }
    }

    fn recorder(status: StatusCode) -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            status,
        })
    }

    #[tokio::test]
    async fn test_rules_apply_in_order() {
        let inner = recorder(StatusCode::OK);
        let transport = InterceptingTransport::new(inner.clone())
            .with_rule(Arc::new(Suffix("-a")))
            .with_rule(Arc::new(Suffix("-b")));

        let response = transport.send(HttpRequest::get("/match")).await.unwrap();

        assert_eq!(inner.seen.lock().unwrap().as_slice(), ["/match-a-b"]);
        assert_eq!(response.text(), "body-a-b");
        assert_eq!(transport.rule_names(), vec!["suffix", "suffix"]);
    }

    #[tokio::test]
    async fn test_unmatched_requests_pass_through() {
        let inner = recorder(StatusCode::OK);
        let transport = InterceptingTransport::new(inner.clone()).with_rule(Arc::new(Suffix("-a")));

        let response = transport.send(HttpRequest::get("/other")).await.unwrap();

        assert_eq!(inner.seen.lock().unwrap().as_slice(), ["/other"]);
        assert_eq!(response.text(), "body");
    }

    #[tokio::test]
    async fn test_failed_responses_are_not_transformed() {
        let inner = recorder(StatusCode::INTERNAL_SERVER_ERROR);
        let transport = InterceptingTransport::new(inner).with_rule(Arc::new(Suffix("-a")));

        let response = transport.send(HttpRequest::get("/match")).await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), "body");
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let transport =
            InterceptingTransport::new(Arc::new(Failing)).with_rule(Arc::new(Suffix("-a")));

        let err = transport.send(HttpRequest::get("/match")).await.unwrap_err();
        assert!(err.is_network());
    }
}
