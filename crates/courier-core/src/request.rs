//! Outbound request descriptor and scoped before-send hooks
//!
//! A retry policy may want to see or rewrite the request before every attempt,
//! for example to route the next attempt to a different endpoint. Rather than
//! keeping a standing subscriber list on the request, the hook is bound for the
//! duration of one execution through [`HookScope`], which detaches it when
//! dropped regardless of how the execution ends.

use std::collections::BTreeMap;

/// An outbound call descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    operation: String,
    method: String,
    path: String,
    endpoint: Option<String>,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request for a logical operation against a resource path
    ///
    /// The operation name selects the retry policy (see
    /// [`crate::types::RetryPoliciesConfig::policy_for`]).
    pub fn new(operation: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            method: method.into(),
            path: path.into(),
            endpoint: None,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Route the request to a specific endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a header, replacing any previous value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Logical operation name, e.g. `read` or `write`
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Request method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Resource path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Endpoint the request is routed to, if one was chosen
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Change the endpoint in place
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = Some(endpoint.into());
    }

    /// Look up a header by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers, sorted by name
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Insert a header in place, replacing any previous value
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// A hook that runs against the request before every send attempt
///
/// `attached` and `detached` bracket one execution. They are called exactly
/// once each per execution.
pub trait BeforeSendHook: Send + Sync {
    /// Inspect or mutate the request before an attempt is sent
    fn before_send(&self, request: &mut Request);

    /// Called when the hook is bound to a request
    fn attached(&self, request: &Request) {
        let _ = request;
    }

    /// Called when the hook is released from a request
    fn detached(&self, request: &Request) {
        let _ = request;
    }
}

/// Scoped binding of an optional before-send hook to a request
///
/// Holds the mutable borrow of the request for the whole execution, so no
/// other execution can bind a hook to the same request concurrently.
pub struct HookScope<'a> {
    request: &'a mut Request,
    hook: Option<&'a dyn BeforeSendHook>,
}

impl<'a> HookScope<'a> {
    /// Bind `hook` to `request` until the returned scope is dropped
    pub fn attach(request: &'a mut Request, hook: Option<&'a dyn BeforeSendHook>) -> Self {
        if let Some(hook) = hook {
            tracing::trace!(operation = %request.operation(), "attaching before-send hook");
            hook.attached(request);
        }
        Self { request, hook }
    }

    /// Run the hook and snapshot the request for one send attempt
    pub fn prepare(&mut self) -> Request {
        if let Some(hook) = self.hook {
            hook.before_send(self.request);
        }
        self.request.clone()
    }

    /// The bound request, as last prepared by the hook
    pub fn request(&self) -> &Request {
        self.request
    }
}

impl Drop for HookScope<'_> {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            tracing::trace!(operation = %self.request.operation(), "detaching before-send hook");
            hook.detached(self.request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingHook {
        attached: AtomicU32,
        detached: AtomicU32,
        sends: AtomicU32,
    }

    impl BeforeSendHook for CountingHook {
        fn before_send(&self, request: &mut Request) {
            let n = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
            request.insert_header("x-attempt", n.to_string());
        }

        fn attached(&self, _request: &Request) {
            self.attached.fetch_add(1, Ordering::SeqCst);
        }

        fn detached(&self, _request: &Request) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new("read", "GET", "/dbs/a/colls/b")
            .with_endpoint("https://east.example")
            .with_header("accept", "application/json")
            .with_body(b"{}".to_vec());

        assert_eq!(request.operation(), "read");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/dbs/a/colls/b");
        assert_eq!(request.endpoint(), Some("https://east.example"));
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.body(), b"{}");
    }

    #[test]
    fn test_hook_scope_attach_detach_once() {
        let hook = CountingHook::default();
        let mut request = Request::new("read", "GET", "/");

        {
            let mut scope = HookScope::attach(&mut request, Some(&hook));
            assert!(scope.request().header("x-attempt").is_none());
            let first = scope.prepare();
            let second = scope.prepare();
            assert_eq!(scope.request(), &second);
            assert_eq!(first.header("x-attempt"), Some("1"));
            assert_eq!(second.header("x-attempt"), Some("2"));
            assert_eq!(hook.detached.load(Ordering::SeqCst), 0);
        }

        assert_eq!(hook.attached.load(Ordering::SeqCst), 1);
        assert_eq!(hook.detached.load(Ordering::SeqCst), 1);
        // Mutations made by the hook stay on the caller's request
        assert_eq!(request.header("x-attempt"), Some("2"));
    }

    #[test]
    fn test_hook_scope_without_hook() {
        let mut request = Request::new("read", "GET", "/");
        let mut scope = HookScope::attach(&mut request, None);
        assert_eq!(scope.prepare(), Request::new("read", "GET", "/"));
    }
}
