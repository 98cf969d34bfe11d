//! # Layout Render - Server-Side Template Sets with Layouts
//!
//! `layout-render` compiles a directory of template files into one named
//! template set, renders pages optionally wrapped in a layout with
//! `yield()`/`partial()` composition, and writes the result with the right
//! `Content-Type` and status to any output stream.
//!
//! ## Core Concepts
//!
//! - [`Render`]: the coordinator. Compiles lazily, renders HTML, JSON, XML,
//!   raw bytes and text, and writes a 500 on failure to sinks that carry a
//!   response head.
//! - [`Options`]: configuration with defaults, builder methods and YAML loading.
//! - [`TemplateSet`]: the compiled, immutable name to template mapping.
//! - [`Sink`]: an output stream, optionally with a response head
//!   ([`ResponseRecorder`]).
//! - [`BufferPool`]: reusable buffers for HTML execution.
//!
//! ## Quick Start
//!
//! ```rust
//! use http::StatusCode;
//! use layout_render::fs::MemoryFileSystem;
//! use layout_render::{Options, Render, ResponseRecorder};
//!
//! let fs = MemoryFileSystem::from_entries(
//!     "templates",
//!     &[
//!         ("layout.tmpl", "<b>{{ yield() }}</b>"),
//!         ("home.tmpl", "Hello {{ this }}."),
//!     ],
//! );
//! let render = Render::new(Options::new().file_system(fs).layout("layout"));
//!
//! let mut rec = ResponseRecorder::new();
//! render.html(&mut rec, StatusCode::OK, "home", "World", None).unwrap();
//!
//! assert_eq!(rec.body_str(), "<b>Hello World.</b>");
//! assert_eq!(rec.headers()["content-type"], "text/html; charset=UTF-8");
//! ```
//!
//! ## Partials
//!
//! Inside a layout, `partial("footer")` renders `footer-<page>`: with the
//! page `home` that is the file `footer-home.tmpl`. Missing partials render
//! as nothing unless [`Options::require_partials`] is set;
//! [`Options::render_partials_without_suffix`] adds a fallback to `footer`.
//!
//! ## Development Mode
//!
//! With [`Options::is_development`] every HTML render recompiles the
//! directory, so edits show up without a restart. Outside development mode
//! the set is compiled once and published without a lock unless
//! [`Options::use_mutex_lock`] asks for one.

pub mod engine;
mod error;
pub mod fs;
pub mod lock;
mod options;
pub mod pool;
mod render;
pub mod sink;
pub mod template;

// Error type
pub use error::{RenderError, Result};

// Configuration
pub use options::{
    Delims, HtmlOptions, Options, CONTENT_BINARY, CONTENT_HTML, CONTENT_JSON, CONTENT_TEXT,
    CONTENT_XML, DEFAULT_CHARSET, DEFAULT_DIRECTORY, DEFAULT_EXTENSION,
};

// Coordinator
pub use render::Render;

// Templates
pub use template::{FuncMap, TemplateRef, TemplateSet};

// Output
pub use engine::{Data, Engine, Head, Html, Json, Text, Xml};
pub use pool::{BufferPool, PooledBuffer, SizedBufferPool};
pub use sink::{write_http_error, ResponseHead, ResponseRecorder, Sink};
