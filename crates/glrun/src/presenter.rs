//! # Presentation side-channel
//!
//! What the guest shows the operator besides pixels: log lines, a list of
//! key/value tags redrawn every frame, the id of the node under the cursor,
//! and diagnostics raised by the harness itself.
//!
//! Tags follow a clear-then-append cycle. The guest calls `clearTags` at
//! the start of a render and `pushTag` for each pair, in display order.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::info;
use tracing::warn;

use crate::handles::Handle;

/// Something the harness wants the operator to know about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A program failed to compile or link. The guest still got `handle`.
    BackendCompileFailure { handle: Handle, log: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BackendCompileFailure { handle, log } => {
                write!(f, "unable to initialize the shader program {}: {}", handle, log)
            }
        }
    }
}

pub trait Presenter: Send + 'static {
    fn log(&mut self, line: &str);
    fn clear_tags(&mut self);
    fn push_tag(&mut self, key: &str, value: &str);
    fn set_node_id(&mut self, id: u32);
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Forwards everything to `tracing`. The default presenter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn log(&mut self, line: &str) {
        info!(target: "guest", "{}", line);
    }

    fn clear_tags(&mut self) {}

    fn push_tag(&mut self, key: &str, value: &str) {
        info!(target: "guest", key, value, "tag");
    }

    fn set_node_id(&mut self, id: u32) {
        info!(target: "guest", id, "closest node");
    }

    fn report(&mut self, diagnostic: &Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// What a [`TagBoard`] has collected so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    pub logs: Vec<String>,
    pub tags: Vec<(String, String)>,
    pub node_id: Option<u32>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Presenter that keeps everything in memory.
///
/// Clones share the same board, so keep one clone to inspect what the
/// guest presented after handing the other to a session.
#[derive(Clone, Debug, Default)]
pub struct TagBoard {
    board: Arc<Mutex<Board>>,
}

impl TagBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current board.
    pub fn snapshot(&self) -> Board {
        self.lock().clone()
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        self.lock().tags.clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.lock().logs.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        // A panic elsewhere doesn't make the collected lines wrong.
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Presenter for TagBoard {
    fn log(&mut self, line: &str) {
        self.lock().logs.push(line.to_string());
    }

    fn clear_tags(&mut self) {
        self.lock().tags.clear();
    }

    fn push_tag(&mut self, key: &str, value: &str) {
        self.lock().tags.push((key.to_string(), value.to_string()));
    }

    fn set_node_id(&mut self, id: u32) {
        self.lock().node_id = Some(id);
    }

    fn report(&mut self, diagnostic: &Diagnostic) {
        warn!("{}", diagnostic);
        self.lock().diagnostics.push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_clear_then_append() {
        let board = TagBoard::new();
        let mut presenter = board.clone();

        presenter.push_tag("highway", "primary");
        presenter.clear_tags();
        presenter.push_tag("name", "Main St");
        presenter.push_tag("lanes", "2");

        assert_eq!(
            board.tags(),
            vec![
                ("name".to_string(), "Main St".to_string()),
                ("lanes".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_board_collects_everything() {
        let board = TagBoard::new();
        let mut presenter = board.clone();
        presenter.log("loaded 12 points");
        presenter.set_node_id(42);
        presenter.report(&Diagnostic::BackendCompileFailure {
            handle: Handle(0),
            log: "syntax error".into(),
        });

        let snap = board.snapshot();
        assert_eq!(snap.logs, vec!["loaded 12 points".to_string()]);
        assert_eq!(snap.node_id, Some(42));
        assert_eq!(snap.diagnostics.len(), 1);
    }
}
