#![forbid(unsafe_code)]

//! Binding wiring and object-level configuration.
//!
//! [`BindingConfiguration`] describes one binding and is consumed by exactly
//! one [`Binding`](crate::Binding). [`ObservableConfig`] tunes an
//! [`ObservableObject`](crate::ObservableObject): how invalid bindings are
//! swept and how enum bindings treat "nothing selected".

use std::fmt;
use std::sync::Arc;

use crate::control::{ControlHandle, WeakControl};
use crate::formatter::ValueFormatter;
use crate::list::ObservableCollection;
use crate::path::PropertyPath;

/// Environment variable read by [`SweepPolicy::from_env`].
pub const SWEEP_ENV: &str = "SCENEBIND_SWEEP";

/// Direction(s) a binding propagates in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BindingMode {
    /// Source to control.
    #[default]
    OneWay,
    /// Control to source.
    OneWayToTarget,
    /// Both directions.
    TwoWay,
}

impl BindingMode {
    /// Whether source changes reach the control.
    #[must_use]
    pub fn reads_source(self) -> bool {
        matches!(self, Self::OneWay | Self::TwoWay)
    }

    /// Whether control edits reach the source.
    #[must_use]
    pub fn writes_source(self) -> bool {
        matches!(self, Self::OneWayToTarget | Self::TwoWay)
    }
}

/// Immutable description of one binding.
#[derive(Clone)]
pub struct BindingConfiguration {
    mode: BindingMode,
    path: PropertyPath,
    control: WeakControl,
    control_path: String,
    control_property: Option<String>,
    formatter: Option<ValueFormatter>,
    target_override: Option<Arc<dyn ObservableCollection>>,
    is_list_binding: bool,
}

impl BindingConfiguration {
    /// Scalar binding of `control_property` on `control` to `path`.
    #[must_use]
    pub fn property(
        mode: BindingMode,
        control: &ControlHandle,
        control_path: impl Into<String>,
        control_property: impl Into<String>,
        path: PropertyPath,
    ) -> Self {
        Self {
            mode,
            path,
            control: WeakControl::new(control),
            control_path: control_path.into(),
            control_property: Some(control_property.into()),
            formatter: None,
            target_override: None,
            is_list_binding: false,
        }
    }

    /// List binding of the items of `control` to the collection at `path`.
    #[must_use]
    pub fn list(
        mode: BindingMode,
        control: &ControlHandle,
        control_path: impl Into<String>,
        path: PropertyPath,
    ) -> Self {
        Self {
            mode,
            path,
            control: WeakControl::new(control),
            control_path: control_path.into(),
            control_property: None,
            formatter: None,
            target_override: None,
            is_list_binding: true,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Option<ValueFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Bind to `collection` directly instead of walking the source path.
    #[must_use]
    pub fn with_target_override(mut self, collection: Arc<dyn ObservableCollection>) -> Self {
        self.target_override = Some(collection);
        self
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn control(&self) -> &WeakControl {
        &self.control
    }

    #[must_use]
    pub fn control_path(&self) -> &str {
        &self.control_path
    }

    /// Bound control property; `None` for list bindings.
    #[must_use]
    pub fn control_property(&self) -> Option<&str> {
        self.control_property.as_deref()
    }

    #[must_use]
    pub fn formatter(&self) -> Option<&ValueFormatter> {
        self.formatter.as_ref()
    }

    #[must_use]
    pub fn target_override(&self) -> Option<&Arc<dyn ObservableCollection>> {
        self.target_override.as_ref()
    }

    #[must_use]
    pub fn is_list_binding(&self) -> bool {
        self.is_list_binding
    }
}

impl fmt::Debug for BindingConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingConfiguration")
            .field("mode", &self.mode)
            .field("path", &self.path.to_string())
            .field("control_path", &self.control_path)
            .field("control_property", &self.control_property)
            .field("control_alive", &self.control.is_alive())
            .field("formatter", &self.formatter)
            .field("target_override", &self.target_override.is_some())
            .field("is_list_binding", &self.is_list_binding)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Object-level configuration
// ---------------------------------------------------------------------------

/// When invalid bindings are pruned from a registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SweepPolicy {
    /// After each notification, on a worker thread (single flight).
    #[default]
    Background,
    /// After each notification, on the notifying thread.
    Inline,
    /// Only when [`ObservableObject::sweep_now`](crate::ObservableObject::sweep_now) is called.
    Manual,
}

impl SweepPolicy {
    /// Parse a policy name, case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "background" | "async" => Some(Self::Background),
            "inline" | "sync" => Some(Self::Inline),
            "manual" | "off" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Read [`SWEEP_ENV`], falling back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(SWEEP_ENV).ok().as_deref())
    }

    /// Pure part of [`from_env`](Self::from_env).
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "unknown SCENEBIND_SWEEP value, using default");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

/// How an enum binding maps a control reporting "no selection" (`-1`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoSelection {
    /// Write the first variant (legacy behavior).
    #[default]
    FirstItem,
    /// Write [`Value::Nil`](crate::Value::Nil).
    Clear,
}

/// Configuration of an [`ObservableObject`](crate::ObservableObject).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObservableConfig {
    pub sweep: SweepPolicy,
    pub no_selection: NoSelection,
}

impl ObservableConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config with the sweep policy taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_sweep(SweepPolicy::from_env())
    }

    #[must_use]
    pub fn with_sweep(mut self, sweep: SweepPolicy) -> Self {
        self.sweep = sweep;
        self
    }

    #[must_use]
    pub fn with_no_selection(mut self, no_selection: NoSelection) -> Self {
        self.no_selection = no_selection;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_directions() {
        assert!(BindingMode::OneWay.reads_source());
        assert!(!BindingMode::OneWay.writes_source());
        assert!(!BindingMode::OneWayToTarget.reads_source());
        assert!(BindingMode::OneWayToTarget.writes_source());
        assert!(BindingMode::TwoWay.reads_source());
        assert!(BindingMode::TwoWay.writes_source());
    }

    #[test]
    fn sweep_policy_parsing() {
        assert_eq!(SweepPolicy::parse("Inline"), Some(SweepPolicy::Inline));
        assert_eq!(SweepPolicy::parse(" MANUAL "), Some(SweepPolicy::Manual));
        assert_eq!(SweepPolicy::parse("async"), Some(SweepPolicy::Background));
        assert_eq!(SweepPolicy::parse("sometimes"), None);
    }

    #[test]
    fn sweep_policy_env_fallback() {
        assert_eq!(SweepPolicy::from_env_value(None), SweepPolicy::Background);
        assert_eq!(
            SweepPolicy::from_env_value(Some("inline")),
            SweepPolicy::Inline
        );
        assert_eq!(
            SweepPolicy::from_env_value(Some("bogus")),
            SweepPolicy::Background
        );
    }

    #[test]
    fn builder_sets_fields() {
        let config = ObservableConfig::new()
            .with_sweep(SweepPolicy::Manual)
            .with_no_selection(NoSelection::Clear);
        assert_eq!(config.sweep, SweepPolicy::Manual);
        assert_eq!(config.no_selection, NoSelection::Clear);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserializes_with_defaults() {
        let config: ObservableConfig = serde_json::from_str(r#"{"sweep":"Inline"}"#).unwrap();
        assert_eq!(config.sweep, SweepPolicy::Inline);
        assert_eq!(config.no_selection, NoSelection::FirstItem);
    }
}
