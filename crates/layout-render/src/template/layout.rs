//! Layout callbacks bound for a single render.
//!
//! A [`LayoutScope`] knows which page is being rendered, the data it is bound
//! to and the functions of the call. [`LayoutScope::into_context`] turns it
//! into the context the layout template executes against, with `yield`,
//! `current` and `partial` closing over that page. Nothing is written to the
//! shared template set, so concurrent renders of different pages never see
//! each other's callbacks.

use std::sync::Arc;

use minijinja::Value;

use super::{CallScope, FuncMap, TemplateSet};

/// How `partial(name)` resolves and what happens when nothing matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialPolicy {
    /// Fall back to a template named `name` when `name-<page>` is missing.
    pub without_suffix: bool,
    /// Execute the resolved name even if it does not exist, surfacing the
    /// engine's not-found error.
    pub required: bool,
}

/// Page-specific state behind the layout callbacks.
#[derive(Debug)]
pub struct LayoutScope {
    set: Arc<TemplateSet>,
    page: String,
    data: Value,
    funcs: FuncMap,
    policy: PartialPolicy,
}

impl LayoutScope {
    pub fn new(
        set: Arc<TemplateSet>,
        page: impl Into<String>,
        data: Value,
        funcs: FuncMap,
        policy: PartialPolicy,
    ) -> Self {
        Self {
            set,
            page: page.into(),
            data,
            funcs,
            policy,
        }
    }

    /// Name of the page being rendered.
    pub fn current(&self) -> &str {
        &self.page
    }

    /// Renders the page with the bound data as safe markup.
    pub fn yield_page(&self) -> Result<Value, minijinja::Error> {
        self.set
            .render_value(&self.page, self.inner_context())
            .map(Value::from_safe_string)
    }

    /// The template name `partial(name)` would execute.
    ///
    /// `name-<page>` is preferred; the bare `name` is used only when the
    /// suffixed template is missing and suffix-less partials are enabled.
    pub fn resolve_partial(&self, name: &str) -> String {
        let suffixed = format!("{}-{}", name, self.page);
        if !self.set.lookup(&suffixed) && self.policy.without_suffix {
            return name.to_string();
        }
        suffixed
    }

    /// Renders a partial, or nothing when it is missing and not required.
    pub fn partial(&self, name: &str) -> Result<Value, minijinja::Error> {
        let resolved = self.resolve_partial(name);
        if !self.policy.required && !self.set.lookup(&resolved) {
            return Ok(Value::from_safe_string(String::new()));
        }
        self.set
            .render_value(&resolved, self.inner_context())
            .map(Value::from_safe_string)
    }

    /// Builds the context for the layout template itself.
    pub fn into_context(self) -> Value {
        let scope = Arc::new(self);
        let yielding = Arc::clone(&scope);
        let naming = Arc::clone(&scope);
        let partials = Arc::clone(&scope);

        CallScope::new(scope.data.clone())
            .with_funcs(&scope.funcs)
            .bind(
                "yield",
                Value::from_function(move || yielding.yield_page()),
            )
            .bind(
                "current",
                Value::from_function(move || {
                    Value::from_safe_string(naming.current().to_string())
                }),
            )
            .bind(
                "partial",
                Value::from_function(move |name: String| partials.partial(&name)),
            )
            .into_value()
    }

    // Pages and partials see the data, the call functions and `current`.
    fn inner_context(&self) -> Value {
        let page = self.page.clone();
        CallScope::new(self.data.clone())
            .with_funcs(&self.funcs)
            .bind(
                "current",
                Value::from_function(move || Value::from_safe_string(page.clone())),
            )
            .into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::options::Options;
    use crate::RenderError;

    fn set_from(files: &[(&str, &str)]) -> Arc<TemplateSet> {
        let fs = MemoryFileSystem::from_entries("templates", files);
        Arc::new(TemplateSet::compile(&Options::new().file_system(fs)).unwrap())
    }

    fn render_layout(
        set: &Arc<TemplateSet>,
        layout: &str,
        page: &str,
        data: Value,
        policy: PartialPolicy,
    ) -> crate::Result<String> {
        let scope = LayoutScope::new(Arc::clone(set), page, data, FuncMap::new(), policy);
        set.render_to_string(layout, scope.into_context())
    }

    // =========================================================================
    // yield / current
    // =========================================================================

    #[test]
    fn test_yield_renders_page_with_same_data() {
        let set = set_from(&[
            ("layout.tmpl", "<b>{{ yield() }}</b>"),
            ("home.tmpl", "Hello {{ this }}."),
        ]);
        let out = render_layout(
            &set,
            "layout",
            "home",
            Value::from("World"),
            PartialPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, "<b>Hello World.</b>");
    }

    #[test]
    fn test_yield_output_is_not_escaped_twice() {
        let set = set_from(&[
            ("layout.tmpl", "{{ yield() }}"),
            ("home.tmpl", "<i>{{ this }}</i>"),
        ]);
        let out = render_layout(
            &set,
            "layout",
            "home",
            Value::from("a&b"),
            PartialPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, "<i>a&amp;b</i>");
    }

    #[test]
    fn test_current_names_the_page_in_layout_and_page() {
        let set = set_from(&[
            ("layout.tmpl", "{{ current() }}:{{ yield() }}"),
            ("admin/users.tmpl", "[{{ current() }}]"),
        ]);
        let out = render_layout(
            &set,
            "layout",
            "admin/users",
            Value::from(()),
            PartialPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, "admin/users:[admin/users]");
    }

    #[test]
    fn test_current_is_not_escaped_in_partials() {
        let set = set_from(&[
            ("layout.tmpl", "{{ yield() }}{{ partial(\"nav\") }}"),
            ("docs/intro.tmpl", "{{ current() }}"),
            ("nav-docs/intro.tmpl", "<a href=\"/{{ current() }}\">{{ current() }}</a>"),
        ]);
        let out = render_layout(
            &set,
            "layout",
            "docs/intro",
            Value::from(()),
            PartialPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, "docs/intro<a href=\"/docs/intro\">docs/intro</a>");
    }

    #[test]
    fn test_yield_missing_page_errors() {
        let set = set_from(&[("layout.tmpl", "{{ yield() }}")]);
        let err = render_layout(
            &set,
            "layout",
            "ghost",
            Value::from(()),
            PartialPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn test_call_funcs_reach_page() {
        let set = set_from(&[
            ("layout.tmpl", "{{ yield() }}"),
            ("home.tmpl", "{{ shout(this) }}"),
        ]);
        let mut funcs = FuncMap::new();
        funcs.insert(
            "shout".into(),
            Value::from_function(|s: String| s.to_uppercase()),
        );
        let scope = LayoutScope::new(
            Arc::clone(&set),
            "home",
            Value::from("quiet"),
            funcs,
            PartialPolicy::default(),
        );
        let out = set.render_to_string("layout", scope.into_context()).unwrap();
        assert_eq!(out, "QUIET");
    }

    // =========================================================================
    // partial
    // =========================================================================

    #[test]
    fn test_partial_prefers_page_suffix() {
        let set = set_from(&[
            ("layout.tmpl", "{{ partial('footer') }}"),
            ("home.tmpl", ""),
            ("footer-home.tmpl", "home footer"),
            ("footer.tmpl", "generic footer"),
        ]);
        let policy = PartialPolicy {
            without_suffix: true,
            required: false,
        };
        let out = render_layout(&set, "layout", "home", Value::from(()), policy).unwrap();
        assert_eq!(out, "home footer");
    }

    #[test]
    fn test_partial_falls_back_without_suffix() {
        let set = set_from(&[
            ("layout.tmpl", "{{ partial('footer') }}"),
            ("about.tmpl", ""),
            ("footer.tmpl", "generic {{ this }}"),
        ]);
        let policy = PartialPolicy {
            without_suffix: true,
            required: false,
        };
        let out = render_layout(&set, "layout", "about", Value::from("x"), policy).unwrap();
        assert_eq!(out, "generic x");
    }

    #[test]
    fn test_partial_bare_name_ignored_by_default() {
        let set = set_from(&[
            ("layout.tmpl", "[{{ partial('footer') }}]"),
            ("about.tmpl", ""),
            ("footer.tmpl", "generic"),
        ]);
        let out = render_layout(
            &set,
            "layout",
            "about",
            Value::from(()),
            PartialPolicy::default(),
        )
        .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_partial_required_missing_errors() {
        let set = set_from(&[("layout.tmpl", "{{ partial('footer') }}"), ("home.tmpl", "")]);
        let policy = PartialPolicy {
            without_suffix: false,
            required: true,
        };
        let err = render_layout(&set, "layout", "home", Value::from(()), policy).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn test_resolve_partial() {
        let set = set_from(&[("footer-home.tmpl", ""), ("nav.tmpl", "")]);
        let strict = LayoutScope::new(
            Arc::clone(&set),
            "home",
            Value::from(()),
            FuncMap::new(),
            PartialPolicy::default(),
        );
        assert_eq!(strict.resolve_partial("footer"), "footer-home");
        assert_eq!(strict.resolve_partial("nav"), "nav-home");

        let relaxed = LayoutScope::new(
            set,
            "home",
            Value::from(()),
            FuncMap::new(),
            PartialPolicy {
                without_suffix: true,
                required: false,
            },
        );
        assert_eq!(relaxed.resolve_partial("nav"), "nav");
        assert_eq!(relaxed.current(), "home");
    }
}
