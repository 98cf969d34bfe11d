//! Renderer configuration.
//!
//! [`Options`] collects every setting the [`Render`](crate::Render)
//! coordinator reads. Values left empty are filled with defaults exactly once,
//! when the coordinator is constructed; per-call overrides go through
//! [`HtmlOptions`] and never modify the base configuration.
//!
//! # Builder
//!
//! ```rust
//! use layout_render::{Options, Render};
//!
//! let render = Render::new(
//!     Options::new()
//!         .directory("views")
//!         .layout("layout")
//!         .extensions([".tmpl", ".html"])
//!         .render_partials_without_suffix(true),
//! );
//! assert_eq!(render.options().layout, "layout");
//! ```
//!
//! # YAML
//!
//! The plain settings can also be loaded from YAML. Functions, the
//! filesystem and the buffer pool are code-only and keep their defaults.
//!
//! ```rust
//! use layout_render::Options;
//!
//! let options = Options::from_yaml(r#"
//! directory: views
//! layout: base
//! extensions: [".tmpl", ".html"]
//! is_development: true
//! delims:
//!   left: "[["
//!   right: "]]"
//! "#).unwrap();
//!
//! assert_eq!(options.directory, "views");
//! assert!(options.is_development);
//! assert_eq!(options.delims.left, "[[");
//! ```

use std::sync::Arc;

use minijinja::Value;
use serde::Deserialize;

use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::pool::{BufferPool, SizedBufferPool};
use crate::template::FuncMap;

/// Default template directory.
pub const DEFAULT_DIRECTORY: &str = "templates";

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = ".tmpl";

/// Default character encoding appended to content types.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Content type for HTML responses.
pub const CONTENT_HTML: &str = "text/html";

/// Content type for JSON responses.
pub const CONTENT_JSON: &str = "application/json";

/// Content type for XML responses.
pub const CONTENT_XML: &str = "text/xml";

/// Content type for plain text responses.
pub const CONTENT_TEXT: &str = "text/plain";

/// Content type for binary responses.
pub const CONTENT_BINARY: &str = "application/octet-stream";

/// Template delimiters.
///
/// Empty fields fall back to the engine defaults: `{{ }}` for expressions
/// and `{% %}` for blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delims {
    /// Left expression delimiter.
    pub left: String,
    /// Right expression delimiter.
    pub right: String,
    /// Left block delimiter.
    pub block_left: String,
    /// Right block delimiter.
    pub block_right: String,
}

impl Delims {
    /// Expression delimiters with the default block delimiters.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            ..Self::default()
        }
    }

    /// Sets the block delimiters.
    pub fn with_block(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.block_left = left.into();
        self.block_right = right.into();
        self
    }

    /// Returns `true` if every delimiter is left at the engine default.
    pub fn is_default(&self) -> bool {
        self.left.is_empty()
            && self.right.is_empty()
            && self.block_left.is_empty()
            && self.block_right.is_empty()
    }
}

/// Configuration for a [`Render`](crate::Render) instance.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory to load templates from. Default is `"templates"`.
    pub directory: String,
    /// Filesystem templates are read from. Default is local disk rooted at `"."`.
    pub file_system: Arc<dyn FileSystem>,
    /// Layout template name. No layout is rendered when empty (the default).
    pub layout: String,
    /// Template file extensions to compile. Default is `[".tmpl"]`.
    pub extensions: Vec<String>,
    /// Function maps available to every template; later maps override earlier keys.
    pub funcs: Vec<FuncMap>,
    /// Template delimiters.
    pub delims: Delims,
    /// Charset appended to the content type. Default is `"UTF-8"`.
    pub charset: String,
    /// Do not append the charset to the content type.
    pub disable_charset: bool,
    /// Content type for HTML responses. Default is `"text/html"`.
    pub html_content_type: String,
    /// Content type for binary responses. Default is `"application/octet-stream"`.
    pub binary_content_type: String,
    /// Bytes written before JSON bodies.
    pub prefix_json: Vec<u8>,
    /// Bytes written before XML bodies.
    pub prefix_xml: Vec<u8>,
    /// Pretty-print JSON bodies.
    pub indent_json: bool,
    /// Pretty-print XML bodies.
    pub indent_xml: bool,
    /// Recompile the templates on every HTML render. Never enable in production.
    pub is_development: bool,
    /// Guard the template set with a read/write lock even outside development mode.
    pub use_mutex_lock: bool,
    /// Execute every partial a layout asks for, failing when it does not exist.
    pub require_partials: bool,
    /// Do not write a 500 response to header-capable sinks when rendering fails.
    pub disable_http_error_rendering: bool,
    /// Let `partial("x")` fall back to a template named `x` when `x-<page>` is missing.
    pub render_partials_without_suffix: bool,
    /// Pool of buffers used for HTML execution.
    pub buffer_pool: Arc<dyn BufferPool>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            directory: DEFAULT_DIRECTORY.to_string(),
            file_system: Arc::new(OsFileSystem::default()),
            layout: String::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            funcs: Vec::new(),
            delims: Delims::default(),
            charset: DEFAULT_CHARSET.to_string(),
            disable_charset: false,
            html_content_type: CONTENT_HTML.to_string(),
            binary_content_type: CONTENT_BINARY.to_string(),
            prefix_json: Vec::new(),
            prefix_xml: Vec::new(),
            indent_json: false,
            indent_xml: false,
            is_development: false,
            use_mutex_lock: false,
            require_partials: false,
            disable_http_error_rendering: false,
            render_partials_without_suffix: false,
            buffer_pool: Arc::new(SizedBufferPool::default()),
        }
    }
}

impl Options {
    /// Creates options with every default applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the plain settings from YAML on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`](crate::RenderError::Config) for
    /// malformed YAML or unknown keys.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: OptionsFile = serde_yaml::from_str(yaml)?;
        Ok(file.apply(Self::default()))
    }

    /// Fills any setting left empty with its default.
    pub(crate) fn prepared(mut self) -> Self {
        if self.directory.is_empty() {
            self.directory = DEFAULT_DIRECTORY.to_string();
        }
        if self.extensions.is_empty() {
            self.extensions = vec![DEFAULT_EXTENSION.to_string()];
        }
        if self.charset.is_empty() {
            self.charset = DEFAULT_CHARSET.to_string();
        }
        if self.html_content_type.is_empty() {
            self.html_content_type = CONTENT_HTML.to_string();
        }
        if self.binary_content_type.is_empty() {
            self.binary_content_type = CONTENT_BINARY.to_string();
        }
        self
    }

    /// The `; charset=<X>` suffix for content types, or empty when disabled.
    pub fn compiled_charset(&self) -> String {
        if self.disable_charset {
            String::new()
        } else {
            format!("; charset={}", self.charset)
        }
    }

    /// Merges all shared function maps, later maps winning.
    pub fn merged_funcs(&self) -> FuncMap {
        let mut merged = FuncMap::new();
        for funcs in &self.funcs {
            merged.extend(funcs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    // -------------------------------------------------------------------------
    // Builder methods
    // -------------------------------------------------------------------------

    /// Sets the template directory.
    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Sets the filesystem templates are read from.
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.file_system = Arc::new(fs);
        self
    }

    /// Sets the default layout.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Replaces the extension allow-list.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a function map.
    pub fn funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs.push(funcs);
        self
    }

    /// Appends a single function in its own map.
    pub fn func(self, name: impl Into<String>, value: Value) -> Self {
        let mut map = FuncMap::new();
        map.insert(name.into(), value);
        self.funcs(map)
    }

    /// Sets the template delimiters.
    pub fn delims(mut self, delims: Delims) -> Self {
        self.delims = delims;
        self
    }

    /// Sets the charset.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Disables the charset suffix on content types.
    pub fn disable_charset(mut self, disable: bool) -> Self {
        self.disable_charset = disable;
        self
    }

    /// Sets the HTML content type.
    pub fn html_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.html_content_type = content_type.into();
        self
    }

    /// Sets the binary content type.
    pub fn binary_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.binary_content_type = content_type.into();
        self
    }

    /// Sets the bytes written before JSON bodies.
    pub fn prefix_json(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix_json = prefix.into();
        self
    }

    /// Sets the bytes written before XML bodies.
    pub fn prefix_xml(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix_xml = prefix.into();
        self
    }

    /// Pretty-prints JSON bodies.
    pub fn indent_json(mut self, indent: bool) -> Self {
        self.indent_json = indent;
        self
    }

    /// Pretty-prints XML bodies.
    pub fn indent_xml(mut self, indent: bool) -> Self {
        self.indent_xml = indent;
        self
    }

    /// Enables development mode.
    pub fn is_development(mut self, enabled: bool) -> Self {
        self.is_development = enabled;
        self
    }

    /// Forces the read/write lock.
    pub fn use_mutex_lock(mut self, enabled: bool) -> Self {
        self.use_mutex_lock = enabled;
        self
    }

    /// Makes every partial mandatory.
    pub fn require_partials(mut self, enabled: bool) -> Self {
        self.require_partials = enabled;
        self
    }

    /// Disables automatic 500 responses.
    pub fn disable_http_error_rendering(mut self, disabled: bool) -> Self {
        self.disable_http_error_rendering = disabled;
        self
    }

    /// Allows partials to resolve without the page suffix.
    pub fn render_partials_without_suffix(mut self, enabled: bool) -> Self {
        self.render_partials_without_suffix = enabled;
        self
    }

    /// Sets the HTML buffer pool.
    pub fn buffer_pool(mut self, pool: impl BufferPool + 'static) -> Self {
        self.buffer_pool = Arc::new(pool);
        self
    }

    /// Sets a shared HTML buffer pool.
    pub fn shared_buffer_pool(mut self, pool: Arc<dyn BufferPool>) -> Self {
        self.buffer_pool = pool;
        self
    }
}

/// Serializable subset of [`Options`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    directory: Option<String>,
    layout: Option<String>,
    extensions: Option<Vec<String>>,
    delims: Option<Delims>,
    charset: Option<String>,
    disable_charset: Option<bool>,
    html_content_type: Option<String>,
    binary_content_type: Option<String>,
    prefix_json: Option<String>,
    prefix_xml: Option<String>,
    indent_json: Option<bool>,
    indent_xml: Option<bool>,
    is_development: Option<bool>,
    use_mutex_lock: Option<bool>,
    require_partials: Option<bool>,
    disable_http_error_rendering: Option<bool>,
    render_partials_without_suffix: Option<bool>,
}

impl OptionsFile {
    fn apply(self, mut options: Options) -> Options {
        if let Some(v) = self.directory {
            options.directory = v;
        }
        if let Some(v) = self.layout {
            options.layout = v;
        }
        if let Some(v) = self.extensions {
            options.extensions = v;
        }
        if let Some(v) = self.delims {
            options.delims = v;
        }
        if let Some(v) = self.charset {
            options.charset = v;
        }
        if let Some(v) = self.html_content_type {
            options.html_content_type = v;
        }
        if let Some(v) = self.binary_content_type {
            options.binary_content_type = v;
        }
        if let Some(v) = self.prefix_json {
            options.prefix_json = v.into_bytes();
        }
        if let Some(v) = self.prefix_xml {
            options.prefix_xml = v.into_bytes();
        }
        options.disable_charset = self.disable_charset.unwrap_or(options.disable_charset);
        options.indent_json = self.indent_json.unwrap_or(options.indent_json);
        options.indent_xml = self.indent_xml.unwrap_or(options.indent_xml);
        options.is_development = self.is_development.unwrap_or(options.is_development);
        options.use_mutex_lock = self.use_mutex_lock.unwrap_or(options.use_mutex_lock);
        options.require_partials = self.require_partials.unwrap_or(options.require_partials);
        options.disable_http_error_rendering = self
            .disable_http_error_rendering
            .unwrap_or(options.disable_http_error_rendering);
        options.render_partials_without_suffix = self
            .render_partials_without_suffix
            .unwrap_or(options.render_partials_without_suffix);
        options
    }
}

/// Per-call overrides for [`Render::html`](crate::Render::html).
#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// Layout for this call. Empty keeps the configured layout.
    pub layout: String,
    /// Functions added for this call only.
    pub funcs: FuncMap,
}

impl HtmlOptions {
    /// Creates empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the layout.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Adds a function for this call.
    pub fn func(mut self, name: impl Into<String>, value: Value) -> Self {
        self.funcs.insert(name.into(), value);
        self
    }
}

/// Effective layout and functions for one HTML call.
#[derive(Debug, Clone)]
pub(crate) struct CallOptions {
    pub layout: String,
    pub funcs: FuncMap,
}

impl CallOptions {
    /// Resolves the per-call values from the base configuration and overrides.
    ///
    /// Only the override functions are carried; shared functions are already
    /// globals of the compiled set, where data fields can shadow them.
    pub fn resolve(base: &Options, overrides: Option<HtmlOptions>) -> Self {
        let mut layout = base.layout.clone();
        let mut funcs = FuncMap::new();

        if let Some(overrides) = overrides {
            if !overrides.layout.is_empty() {
                layout = overrides.layout;
            }
            funcs = overrides.funcs;
        }

        Self { layout, funcs }
    }
}
