#![forbid(unsafe_code)]

//! Headless test bed for scenebind.
//!
//! Provides what a host engine would: a [`HeadlessScene`] resolving control
//! paths, [`TestControl`]s that record every read, write and item edit, and
//! binders for the common widget kinds ([`standard_binders`]). The
//! [`fixtures`] module carries small view models used by the integration
//! tests in `tests/`.

pub mod binders;
pub mod control;
pub mod fixtures;
pub mod scene;

pub use binders::{BasicBinder, ListControlBinder, standard_binders};
pub use control::{ItemOp, PropertyEdit, TestControl};
pub use scene::HeadlessScene;

use std::sync::Arc;

use scenebind_core::{ControlBinderProvider, SceneTree};

/// A fresh scene plus the standard binder provider.
#[must_use]
pub fn headless() -> (Arc<HeadlessScene>, Arc<dyn SceneTree>, Arc<ControlBinderProvider>) {
    let scene = HeadlessScene::new();
    let tree: Arc<dyn SceneTree> = scene.clone();
    (scene, tree, Arc::new(standard_binders()))
}
