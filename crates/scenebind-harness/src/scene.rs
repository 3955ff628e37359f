#![forbid(unsafe_code)]

//! Path-addressed control registry standing in for a scene tree.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use scenebind_core::{ControlHandle, SceneTree};

use crate::control::TestControl;

/// Flat map from control path (`"%HealthLabel"`, `"Hud/Name"`) to control.
///
/// The scene holds one strong reference per control. [`destroy`](Self::destroy)
/// drops it; the control is destroyed once the caller's copies are gone too.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: Mutex<AHashMap<String, Arc<TestControl>>>,
}

impl HeadlessScene {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn nodes(&self) -> MutexGuard<'_, AHashMap<String, Arc<TestControl>>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a control of `kind` at `path`, replacing any previous one.
    pub fn spawn(&self, path: &str, kind: &str) -> Arc<TestControl> {
        let name = path
            .rsplit('/')
            .next()
            .unwrap_or(path)
            .trim_start_matches('%');
        let control = TestControl::new(kind, name);
        tracing::trace!(path, kind, "control spawned");
        let previous = self.nodes().insert(path.to_owned(), Arc::clone(&control));
        drop(previous);
        control
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<TestControl>> {
        self.nodes().get(path).cloned()
    }

    /// Remove the scene's reference to the control at `path`.
    pub fn destroy(&self, path: &str) -> bool {
        let removed = self.nodes().remove(path);
        removed.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }
}

impl SceneTree for HeadlessScene {
    fn resolve(&self, path: &str) -> Option<ControlHandle> {
        let control = self.get(path)?;
        Some(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_resolve_destroy() {
        let scene = HeadlessScene::new();
        let label = scene.spawn("Hud/%Health", "Label");
        assert_eq!(label.name(), "Health");
        assert!(scene.resolve("Hud/%Health").is_some_and(|c| c.kind() == "Label"));
        assert!(scene.resolve("Hud/%Mana").is_none());

        let weak = Arc::downgrade(&label);
        drop(label);
        assert!(scene.destroy("Hud/%Health"));
        assert!(weak.upgrade().is_none());
        assert!(!scene.destroy("Hud/%Health"));
        assert!(scene.is_empty());
    }
}
