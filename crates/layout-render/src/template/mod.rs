//! Template sets, layouts and partials.
//!
//! A directory of template files is compiled into one [`TemplateSet`]. Each
//! file becomes a template named after its path relative to the directory,
//! without extension and with `/` separators:
//!
//! | File | Template name |
//! |------|---------------|
//! | `templates/home.tmpl` | `home` |
//! | `templates/admin/users.tmpl` | `admin/users` |
//!
//! ## Layouts
//!
//! When a layout is configured, rendering page `home` executes the layout
//! template instead, with three functions bound to that call:
//!
//! - `yield()` renders `home` with the same data, as safe markup;
//! - `current()` returns `"home"`;
//! - `partial("sidebar")` renders `sidebar-home` if it exists, optionally
//!   falling back to `sidebar`; missing partials render as nothing unless
//!   partials are required.
//!
//! ```jinja
//! <html>
//!   <body>{{ yield() }}</body>
//!   <aside>{{ partial("sidebar") }}</aside>
//! </html>
//! ```
//!
//! ## Bound data
//!
//! The bound data is reachable as `this`; when it is a map or struct its
//! fields are also top-level variables.

mod helpers;
pub mod layout;
mod scope;
mod set;

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::Value;
use serde::Serialize;

use crate::error::Result;

pub use helpers::register_helpers;
pub use layout::{LayoutScope, PartialPolicy};
pub use scope::{CallScope, THIS};
pub use set::{template_name, TemplateSet};

/// Named functions exposed to templates, built with [`Value::from_function`].
///
/// ```rust
/// use layout_render::FuncMap;
/// use minijinja::Value;
///
/// let mut funcs = FuncMap::new();
/// funcs.insert("shout".into(), Value::from_function(|s: String| s.to_uppercase()));
/// ```
pub type FuncMap = BTreeMap<String, Value>;

/// A handle to one template in a compiled set.
///
/// Holds the set alive independently of the renderer, so it stays usable
/// after a development-mode recompile.
#[derive(Debug, Clone)]
pub struct TemplateRef {
    set: Arc<TemplateSet>,
    name: String,
}

impl TemplateRef {
    pub(crate) fn new(set: Arc<TemplateSet>, name: impl Into<String>) -> Self {
        Self {
            set,
            name: name.into(),
        }
    }

    /// The template's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The set this template belongs to.
    pub fn set(&self) -> &Arc<TemplateSet> {
        &self.set
    }

    /// Renders the template on its own, without layout.
    pub fn render<S: Serialize>(&self, data: S) -> Result<String> {
        let scope = CallScope::new(Value::from_serialize(&data));
        self.set.render_to_string(&self.name, scope.into_value())
    }
}
