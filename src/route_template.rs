//! Renders route groups into route-registration source.
//!
//! Each group becomes a `<group>_routes` function building the group's own axum `Router`,
//! so layers can wrap one group, and an `add_route_<group>` function merging it into a
//! caller's router. Handlers delegate to a runtime `handle` adapter binding a service method.

use crate::error::Result;
use crate::route_collector::{HttpMethod, RouteGroup};
use log::debug;
use minijinja::Environment;
use serde::Serialize;

/// Module path of the service traits used when none is configured.
pub const DEFAULT_PROTO_MODULE: &str = "crate::proto";
/// Crate providing the `handle` adapter used when none is configured.
pub const DEFAULT_RUNTIME_CRATE: &str = "apicat_rpc";

const TEMPLATE_NAME: &str = "routes.rs";
const TEMPLATE: &str = r#"// Code generated by apicat-from-source. DO NOT EDIT.

use std::sync::Arc;

use axum::routing::{on, MethodFilter};
use axum::Router;
{% for group in groups %}
/// Routes of `{{ group.name }}` on their own router, for group-scoped layers.
pub fn {{ group.fn_name }}_routes<S>(srv: Arc<S>) -> Router
where
    S: {{ proto_module }}::{{ group.name }} + Send + Sync + 'static,
{
    Router::new()
    {%- for route in group.routes %}
        .route(
            "{{ route.path | replace_path }}",
            on(MethodFilter::{{ route.method }}, {{ runtime_crate }}::handle(srv.clone(), S::{{ route.name }})),
        )
    {%- endfor %}
}

pub fn add_route_{{ group.fn_name }}<S>(router: Router, srv: Arc<S>) -> Router
where
    S: {{ proto_module }}::{{ group.name }} + Send + Sync + 'static,
{
    router.merge({{ group.fn_name }}_routes(srv))
}
{% endfor %}"#;

#[derive(Serialize)]
struct TemplateContext<'a> {
    proto_module: &'a str,
    runtime_crate: &'a str,
    groups: Vec<GroupContext<'a>>,
}

#[derive(Serialize)]
struct GroupContext<'a> {
    name: &'a str,
    fn_name: String,
    routes: Vec<RouteContext<'a>>,
}

#[derive(Serialize)]
struct RouteContext<'a> {
    name: &'a str,
    method: HttpMethod,
    /// Base path followed by the route path, still in brace form
    path: String,
}

/// Route templater - renders registration source for route groups.
pub struct RouteTemplater {
    proto_module: String,
    runtime_crate: String,
}

impl Default for RouteTemplater {
    fn default() -> Self {
        Self::new(DEFAULT_PROTO_MODULE, DEFAULT_RUNTIME_CRATE)
    }
}

impl RouteTemplater {
    pub fn new(proto_module: impl Into<String>, runtime_crate: impl Into<String>) -> Self {
        Self {
            proto_module: proto_module.into(),
            runtime_crate: runtime_crate.into(),
        }
    }

    pub fn render(&self, groups: &[RouteGroup]) -> Result<String> {
        debug!("Rendering route registration for {} groups", groups.len());

        let mut env = Environment::new();
        env.add_filter("replace_path", |path: String| replace_path(&path));
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;

        let context = TemplateContext {
            proto_module: &self.proto_module,
            runtime_crate: &self.runtime_crate,
            groups: groups
                .iter()
                .map(|group| GroupContext {
                    name: &group.name,
                    fn_name: snake_case(&group.name),
                    routes: group
                        .routes
                        .values()
                        .map(|route| RouteContext {
                            name: &route.name,
                            method: route.method,
                            path: format!("{}{}", group.base_path, route.path),
                        })
                        .collect(),
                })
                .collect(),
        };

        let mut source = env.get_template(TEMPLATE_NAME)?.render(context)?;
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(source)
    }
}

/// Rewrites `{name}` path segments into the router's `:name` form.
pub fn replace_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => format!(":{}", name),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `WidgetService` -> `widget_service`; acronyms stay together (`HTTPService` -> `http_service`).
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut snake = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                snake.push('_');
            }
        }
        snake.extend(c.to_lowercase());
    }
    snake
}
