//! Diagnostics tree for request executions
//!
//! Every execution records a tree of named scopes: one node per send attempt
//! and one per retry-decision evaluation, nested under the caller's scope.
//! Each scope also enters a `tracing` span so the same structure shows up in
//! logs. Scopes are observational only and never influence control flow.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::Span;

#[derive(Debug)]
struct Node {
    name: String,
    started: Instant,
    elapsed: Option<Duration>,
    children: Vec<Arc<Mutex<Node>>>,
}

impl Node {
    fn new(name: String) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            name,
            started: Instant::now(),
            elapsed: None,
            children: Vec::new(),
        }))
    }
}

// A panicking observer must not take the diagnostics tree down with it.
fn lock(node: &Mutex<Node>) -> MutexGuard<'_, Node> {
    node.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A handle to one open node of the diagnostics tree
///
/// The node is closed when [`TraceScope::close`] is called or the handle is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct TraceScope {
    node: Arc<Mutex<Node>>,
    span: Span,
}

impl TraceScope {
    /// Start a new diagnostics tree
    pub fn root(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("trace_scope", scope = %name);
        Self {
            node: Node::new(name),
            span,
        }
    }

    /// Open a child scope under this one
    pub fn start_child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!(parent: &self.span, "trace_scope", scope = %name);
        let node = Node::new(name);
        lock(&self.node).children.push(Arc::clone(&node));
        Self { node, span }
    }

    /// Name the scope was opened with
    pub fn name(&self) -> String {
        lock(&self.node).name.clone()
    }

    /// The tracing span paired with this scope
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Whether the elapsed time has been recorded
    pub fn is_closed(&self) -> bool {
        lock(&self.node).elapsed.is_some()
    }

    /// Close the scope, recording its elapsed time
    pub fn close(self) {
        // Drop does the work
    }

    fn finish(&self) {
        let mut node = lock(&self.node);
        if node.elapsed.is_none() {
            node.elapsed = Some(node.started.elapsed());
        }
    }

    /// Snapshot the subtree rooted at this scope
    pub fn summary(&self) -> TraceSummary {
        TraceSummary::from_node(&self.node)
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Serializable snapshot of a diagnostics subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraceSummary {
    pub name: String,
    /// `None` while the scope is still open
    pub elapsed_ms: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceSummary>,
}

impl TraceSummary {
    fn from_node(node: &Mutex<Node>) -> Self {
        let node = lock(node);
        Self {
            name: node.name.clone(),
            elapsed_ms: node.elapsed.map(|d| d.as_secs_f64() * 1000.0),
            children: node
                .children
                .iter()
                .map(|child| TraceSummary::from_node(child))
                .collect(),
        }
    }

    /// Names of the direct children, in creation order
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Render as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
