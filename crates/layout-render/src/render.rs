//! The render coordinator.

use std::sync::Arc;

use http::StatusCode;
use minijinja::Value;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{Data, Engine, Head, Html, Json, Text, Xml};
use crate::error::Result;
use crate::lock::{select_guard, SetGuard};
use crate::options::{CallOptions, HtmlOptions, Options, CONTENT_JSON, CONTENT_TEXT, CONTENT_XML};
use crate::sink::{write_http_error, Sink};
use crate::template::{CallScope, LayoutScope, PartialPolicy, TemplateRef, TemplateSet};

/// Compiles templates on demand and renders responses into sinks.
///
/// `Render` is `Send + Sync`; share one instance across request handlers.
///
/// ```rust,ignore
/// use http::StatusCode;
/// use layout_render::{HtmlOptions, Options, Render, ResponseRecorder};
///
/// let render = Render::new(Options::new().layout("layout"));
///
/// let mut rec = ResponseRecorder::new();
/// render.html(&mut rec, StatusCode::OK, "home", "World", None)?;
///
/// // Same page, different layout, for this call only.
/// let mut rec = ResponseRecorder::new();
/// render.html(&mut rec, StatusCode::OK, "home", "World", Some(HtmlOptions::new().layout("admin")))?;
/// ```
pub struct Render {
    opt: Options,
    guard: Box<dyn SetGuard>,
    compiled_charset: String,
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Render")
            .field("opt", &self.opt)
            .field("locking", &self.guard.is_locking())
            .finish()
    }
}

impl Default for Render {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Render {
    /// Creates a coordinator. Empty settings are filled with defaults here;
    /// templates are compiled lazily on the first HTML render.
    pub fn new(options: Options) -> Self {
        let opt = options.prepared();
        let guard = select_guard(opt.is_development, opt.use_mutex_lock);
        let compiled_charset = opt.compiled_charset();
        Self {
            opt,
            guard,
            compiled_charset,
        }
    }

    /// The effective configuration.
    pub fn options(&self) -> &Options {
        &self.opt
    }

    /// Compiles the template directory and publishes the result.
    ///
    /// # Errors
    ///
    /// Compilation errors leave no set published; lookups find nothing until
    /// a later compile succeeds. Renders already holding the previous set
    /// finish with it.
    pub fn compile_templates(&self) -> Result<()> {
        debug!(directory = %self.opt.directory, "compiling templates");
        self.guard.recompile(&|| TemplateSet::compile(&self.opt))?;
        Ok(())
    }

    /// Looks up a template in the current set without compiling.
    pub fn template_lookup(&self, name: &str) -> Option<TemplateRef> {
        let set = self.guard.load()?;
        if set.lookup(name) {
            Some(TemplateRef::new(set, name))
        } else {
            None
        }
    }

    /// Renders the template `name`, wrapped in the effective layout when one
    /// is set and `name` exists.
    pub fn html<T: Serialize + ?Sized>(
        &self,
        sink: &mut dyn Sink,
        status: StatusCode,
        name: &str,
        data: &T,
        options: Option<HtmlOptions>,
    ) -> Result<()> {
        let set = match self.current_set() {
            Ok(set) => set,
            Err(err) => return Err(self.fail(sink, err)),
        };

        let call = CallOptions::resolve(&self.opt, options);
        let data = Value::from_serialize(data);

        let (target, ctx) = if !call.layout.is_empty() && set.lookup(name) {
            let scope = LayoutScope::new(
                Arc::clone(&set),
                name,
                data,
                call.funcs,
                self.partial_policy(),
            );
            (call.layout, scope.into_context())
        } else {
            let scope = CallScope::new(data).with_funcs(&call.funcs);
            (name.to_string(), scope.into_value())
        };

        let engine = Html {
            head: Head::new(
                format!("{}{}", self.opt.html_content_type, self.compiled_charset),
                status,
            ),
            name: target,
            set,
            pool: Arc::clone(&self.opt.buffer_pool),
        };
        self.render(sink, &engine, &ctx)
    }

    /// Runs `engine` and, on failure, writes a 500 to header-capable sinks
    /// unless that is disabled. The error is always returned.
    pub fn render<T, E>(&self, sink: &mut dyn Sink, engine: &E, data: &T) -> Result<()>
    where
        T: ?Sized,
        E: Engine<T>,
    {
        engine.render(sink, data).map_err(|err| self.fail(sink, err))
    }

    /// Serializes `data` as JSON.
    pub fn json<T: Serialize + ?Sized>(
        &self,
        sink: &mut dyn Sink,
        status: StatusCode,
        data: &T,
    ) -> Result<()> {
        let engine = Json {
            head: self.head(CONTENT_JSON, status),
            indent: self.opt.indent_json,
            prefix: self.opt.prefix_json.clone(),
        };
        self.render(sink, &engine, data)
    }

    /// Serializes `data` as XML.
    pub fn xml<T: Serialize + ?Sized>(
        &self,
        sink: &mut dyn Sink,
        status: StatusCode,
        data: &T,
    ) -> Result<()> {
        let engine = Xml {
            head: self.head(CONTENT_XML, status),
            indent: self.opt.indent_xml,
            prefix: self.opt.prefix_xml.clone(),
        };
        self.render(sink, &engine, data)
    }

    /// Writes raw bytes with the binary content type.
    pub fn data(&self, sink: &mut dyn Sink, status: StatusCode, data: &[u8]) -> Result<()> {
        let engine = Data {
            head: Head::new(self.opt.binary_content_type.clone(), status),
        };
        self.render(sink, &engine, data)
    }

    /// Writes plain text.
    pub fn text(&self, sink: &mut dyn Sink, status: StatusCode, text: &str) -> Result<()> {
        let engine = Text {
            head: self.head(CONTENT_TEXT, status),
        };
        self.render(sink, &engine, text)
    }

    fn current_set(&self) -> Result<Arc<TemplateSet>> {
        let build = || TemplateSet::compile(&self.opt);
        if self.opt.is_development {
            debug!(directory = %self.opt.directory, "recompiling templates");
            self.guard.recompile(&build)
        } else {
            self.guard.get_or_compile(&build)
        }
    }

    fn partial_policy(&self) -> PartialPolicy {
        PartialPolicy {
            without_suffix: self.opt.render_partials_without_suffix,
            required: self.opt.require_partials,
        }
    }

    fn head(&self, content_type: &str, status: StatusCode) -> Head {
        Head::new(format!("{}{}", content_type, self.compiled_charset), status)
    }

    fn fail(&self, sink: &mut dyn Sink, err: crate::RenderError) -> crate::RenderError {
        if self.opt.disable_http_error_rendering || sink.response_head().is_none() {
            return err;
        }
        warn!(error = %err, "rendering failed, responding with 500");
        if let Err(io) = write_http_error(sink, &err.to_string()) {
            warn!(error = %io, "failed to write error response");
        }
        err
    }
}
