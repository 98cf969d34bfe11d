//! Compiling a directory tree into a named template set.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use tracing::{debug, trace};

use super::helpers::register_helpers;
use crate::error::{RenderError, Result};
use crate::fs::is_root;
use crate::options::{Delims, Options};

/// A compiled, immutable collection of named templates.
///
/// All templates share one namespace, one delimiter configuration and one
/// set of global functions. The set is rebuilt wholesale, never patched.
#[derive(Debug)]
pub struct TemplateSet {
    env: Environment<'static>,
    names: BTreeSet<String>,
}

impl TemplateSet {
    /// Walks `options.directory` on `options.file_system` and compiles every
    /// file whose extension is in `options.extensions`.
    ///
    /// Shared function maps are registered in order, then the built-in
    /// helpers. HTML auto-escaping applies to every template.
    ///
    /// # Errors
    ///
    /// The first unreadable matched file or template that fails to parse
    /// aborts the pass; no set is returned. Walk errors and non-matching files
    /// are skipped.
    pub fn compile(options: &Options) -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        if !options.delims.is_default() {
            env.set_syntax(syntax_config(&options.delims)?);
        }
        for (name, func) in options.merged_funcs() {
            env.add_global(name, func);
        }
        register_helpers(&mut env);

        let dir = Path::new(&options.directory);
        let mut names = BTreeSet::new();

        for entry in options.file_system.walk(dir) {
            if entry.is_dir {
                continue;
            }
            let Some(relative) = relative_to(&entry.path, dir) else {
                continue;
            };
            let Some(name) = template_name(relative, &options.extensions) else {
                trace!(path = %entry.path.display(), "skipping non-template file");
                continue;
            };

            let bytes = options
                .file_system
                .read_file(&entry.path)
                .map_err(|source| read_error(&entry.path, source))?;
            let source = String::from_utf8(bytes).map_err(|err| {
                read_error(&entry.path, io::Error::new(io::ErrorKind::InvalidData, err))
            })?;

            env.add_template_owned(name.clone(), source)
                .map_err(|err| RenderError::Compile {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
            trace!(template = %name, "compiled template");
            names.insert(name);
        }

        debug!(
            directory = %options.directory,
            templates = names.len(),
            "compiled template set"
        );
        Ok(Self { env, names })
    }

    /// Returns `true` if a template with this name is in the set.
    pub fn lookup(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names of all compiled templates, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of compiled templates.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the set holds no templates.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Executes `name` against `ctx`, writing into `out`.
    ///
    /// Names are passed straight to the engine; an unknown name fails with
    /// [`RenderError::TemplateNotFound`].
    pub fn execute<S: Serialize, W: io::Write>(&self, name: &str, ctx: S, out: W) -> Result<()> {
        let template = self.env.get_template(name)?;
        template.render_captured_to(ctx, out)?;
        Ok(())
    }

    /// Executes `name` against `ctx` and returns the output.
    pub fn render_to_string<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        Ok(self.render_value(name, ctx)?)
    }

    /// Engine-level execution used by layout callbacks, keeping the engine's
    /// error kinds intact.
    pub(crate) fn render_value<S: Serialize>(
        &self,
        name: &str,
        ctx: S,
    ) -> std::result::Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

/// Derives a template name from a path relative to the template directory.
///
/// Returns `None` when the final extension is not exactly one of
/// `extensions` or nothing is left after stripping it.
///
/// ```rust
/// use layout_render::template::template_name;
/// use std::path::Path;
///
/// let exts = vec![".tmpl".to_string()];
/// assert_eq!(template_name(Path::new("admin/users.tmpl"), &exts).as_deref(), Some("admin/users"));
/// assert_eq!(template_name(Path::new("home.html"), &exts), None);
/// ```
pub fn template_name(relative: &Path, extensions: &[String]) -> Option<String> {
    let file_name = relative.file_name()?.to_str()?;
    let ext = &file_name[file_name.rfind('.')?..];
    if !extensions.iter().any(|allowed| allowed == ext) {
        return None;
    }

    let parts: Vec<Cow<'_, str>> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    let joined = parts.join("/");
    let name = joined.strip_suffix(ext)?;
    if name.is_empty() || name.ends_with('/') {
        return None;
    }
    Some(name.to_string())
}

fn relative_to<'a>(path: &'a Path, dir: &Path) -> Option<&'a Path> {
    if is_root(dir) {
        Some(path)
    } else {
        path.strip_prefix(dir).ok()
    }
}

fn read_error(path: &Path, source: io::Error) -> RenderError {
    RenderError::Read {
        path: PathBuf::from(path),
        source,
    }
}

fn syntax_config(delims: &Delims) -> Result<SyntaxConfig> {
    fn pick(value: &str, default: &'static str) -> String {
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    }

    SyntaxConfig::builder()
        .variable_delimiters(pick(&delims.left, "{{"), pick(&delims.right, "}}"))
        .block_delimiters(
            pick(&delims.block_left, "{%"),
            pick(&delims.block_right, "%}"),
        )
        .build()
        .map_err(|err| RenderError::Config(format!("invalid delimiters: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use minijinja::Value;
    use proptest::prelude::*;

    fn options(fs: MemoryFileSystem) -> Options {
        Options::new().file_system(fs)
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Naming
    // =========================================================================

    #[test]
    fn test_template_name_strips_extension() {
        let e = exts(&[".tmpl"]);
        assert_eq!(template_name(Path::new("home.tmpl"), &e).as_deref(), Some("home"));
        assert_eq!(
            template_name(Path::new("a/b/c.tmpl"), &e).as_deref(),
            Some("a/b/c")
        );
    }

    #[test]
    fn test_template_name_uses_final_extension_only() {
        let e = exts(&[".tmpl"]);
        assert_eq!(
            template_name(Path::new("page.html.tmpl"), &e).as_deref(),
            Some("page.html")
        );
        assert_eq!(template_name(Path::new("page.tmpl.bak"), &e), None);
    }

    #[test]
    fn test_template_name_rejects_unlisted_and_bare() {
        let e = exts(&[".tmpl"]);
        assert_eq!(template_name(Path::new("README"), &e), None);
        assert_eq!(template_name(Path::new("home.html"), &e), None);
        assert_eq!(template_name(Path::new(".tmpl"), &e), None);
    }

    #[test]
    fn test_template_name_matches_extension_exactly() {
        let e = exts(&[".tmpl"]);
        assert_eq!(template_name(Path::new("home.TMPL"), &e), None);
    }

    proptest! {
        #[test]
        fn prop_name_is_relative_path_without_extension(
            segments in prop::collection::vec("[a-z][a-z0-9_-]{0,7}", 1..5),
            ext in prop::sample::select(vec![".tmpl", ".html", ".j2"]),
        ) {
            let allowed = exts(&[".tmpl", ".html", ".j2"]);
            let mut path = PathBuf::new();
            for segment in &segments[..segments.len() - 1] {
                path.push(segment);
            }
            path.push(format!("{}{}", segments[segments.len() - 1], ext));

            let name = template_name(&path, &allowed);
            prop_assert_eq!(name, Some(segments.join("/")));
        }

        #[test]
        fn prop_unlisted_extension_yields_nothing(
            segments in prop::collection::vec("[a-z]{1,8}", 1..4),
        ) {
            let allowed = exts(&[".tmpl"]);
            let mut path: PathBuf = segments.iter().collect();
            path.set_extension("txt");
            prop_assert_eq!(template_name(&path, &allowed), None);
        }
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    #[test]
    fn test_compile_names_every_matching_file() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/home.tmpl", "home")
            .with_file("templates/admin/users.tmpl", "users")
            .with_file("templates/notes.txt", "ignored")
            .with_file("elsewhere/other.tmpl", "outside");

        let set = TemplateSet::compile(&options(fs)).unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["admin/users", "home"]);
        assert!(set.lookup("home"));
        assert!(!set.lookup("notes"));
        assert!(!set.lookup("other"));
    }

    #[test]
    fn test_compile_multiple_extensions() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/a.tmpl", "a")
            .with_file("templates/b.html", "b");
        let opts = options(fs).extensions([".tmpl", ".html"]);

        let set = TemplateSet::compile(&opts).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.render_to_string("b", ()).unwrap(), "b");
    }

    #[test]
    fn test_compile_same_stem_last_wins() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/page.html", "from html")
            .with_file("templates/page.tmpl", "from tmpl");
        let opts = options(fs).extensions([".tmpl", ".html"]);

        let set = TemplateSet::compile(&opts).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.render_to_string("page", ()).unwrap(), "from tmpl");
    }

    #[test]
    fn test_compile_parse_error_aborts() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/a.tmpl", "fine")
            .with_file("templates/b.tmpl", "{% if %}")
            .with_file("templates/c.tmpl", "fine");

        let err = TemplateSet::compile(&options(fs)).unwrap_err();
        match err {
            RenderError::Compile { name, .. } => assert_eq!(name, "b"),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_invalid_utf8_is_read_error() {
        let fs = MemoryFileSystem::new().with_file("templates/bin.tmpl", vec![0xff, 0xfe]);
        let err = TemplateSet::compile(&options(fs)).unwrap_err();
        assert!(matches!(err, RenderError::Read { .. }));
    }

    #[test]
    fn test_compile_missing_directory_is_empty() {
        let set = TemplateSet::compile(&options(MemoryFileSystem::new())).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_compile_directory_dot() {
        let fs = MemoryFileSystem::new().with_file("sub/x.tmpl", "x");
        let set = TemplateSet::compile(&options(fs).directory(".")).unwrap();
        assert!(set.lookup("sub/x"));
    }

    #[test]
    fn test_compile_registers_shared_funcs() {
        let fs = MemoryFileSystem::new().with_file("templates/page.tmpl", "{{ greet('you') }}");
        let opts = options(fs).func(
            "greet",
            Value::from_function(|name: String| format!("hi {}", name)),
        );

        let set = TemplateSet::compile(&opts).unwrap();
        assert_eq!(set.render_to_string("page", ()).unwrap(), "hi you");
    }

    #[test]
    fn test_compile_auto_escapes_html() {
        let fs = MemoryFileSystem::new().with_file("templates/page.tmpl", "{{ this }}");
        let set = TemplateSet::compile(&options(fs)).unwrap();
        let scope = crate::template::CallScope::new(Value::from("<b>"));
        assert_eq!(
            set.render_to_string("page", scope.into_value()).unwrap(),
            "&lt;b&gt;"
        );
    }

    #[test]
    fn test_compile_custom_delims() {
        let fs = MemoryFileSystem::new()
            .with_file("templates/page.tmpl", "[[ this ]] {{ untouched }}");
        let opts = options(fs).delims(Delims::new("[[", "]]"));

        let set = TemplateSet::compile(&opts).unwrap();
        let scope = crate::template::CallScope::new(Value::from("x"));
        assert_eq!(
            set.render_to_string("page", scope.into_value()).unwrap(),
            "x {{ untouched }}"
        );
    }

    #[test]
    fn test_execute_unknown_template() {
        let set = TemplateSet::compile(&options(MemoryFileSystem::new())).unwrap();
        let err = set.execute("missing", (), Vec::new()).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }
}
