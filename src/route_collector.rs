//! Route collection from annotated service traits.
//!
//! Every trait whose name ends in `Service` is a route group. Its doc comment may carry an
//! `@group <basePath>` directive; each of its methods must carry `@route <METHOD> <path>` and
//! follow the handler signature
//!
//! ```text
//! fn name(&self, ctx: C, req: &Request) -> Result<Response, Error>
//! ```
//!
//! where `Request` and `Response` may be the empty sentinel `()` (or any type named `Empty`).

use crate::annotation::{doc_lines, Directive};
use crate::error::{Error, Location, Result};
use crate::parser::ParsedFile;
use crate::schema_compiler::{JsonSchema, SchemaCompiler};
use crate::struct_collector::StructDescriptor;
use crate::type_resolver::{FieldType, TypeResolver};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use syn::ext::IdentExt;
use syn::{
    FnArg, GenericArgument, ItemTrait, PathArguments, ReturnType, TraitItem, TraitItemFn, Type,
};

/// Suffix that marks a trait as a route group.
pub const SERVICE_SUFFIX: &str = "Service";
/// Last path segment of the empty sentinel type.
pub const EMPTY_SENTINEL: &str = "Empty";
/// Last path segment of the error type every handler returns.
pub const ERROR_TYPE: &str = "Error";

/// HTTP methods accepted by `@route`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    /// Parses a method name case-insensitively.
    fn from_str(method: &str) -> Result<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(Error::InvalidArgument(format!("unknown HTTP method `{}`", method))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Header,
    Query,
    Cookie,
    Uri,
}

impl ParameterLocation {
    pub const ALL: [ParameterLocation; 4] = [
        ParameterLocation::Header,
        ParameterLocation::Query,
        ParameterLocation::Cookie,
        ParameterLocation::Uri,
    ];

    /// The field tag key marking a parameter at this location.
    pub fn tag_key(&self) -> &'static str {
        match self {
            ParameterLocation::Header => "header",
            ParameterLocation::Query => "query",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Uri => "uri",
        }
    }
}

/// A request parameter read from a header, the query, a cookie or the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub schema: JsonSchema,
    pub required: bool,
}

/// One service method bound to an HTTP method and path.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    /// Name of the trait method
    pub name: String,
    pub method: HttpMethod,
    /// Path relative to the group's base path
    pub path: String,
    pub description: String,
    /// Success status from `@code`
    pub code: Option<u16>,
    /// Request type name, `None` for the empty sentinel
    pub input: Option<String>,
    /// Response type name, `None` for the empty sentinel
    pub output: Option<String>,
    pub parameters: BTreeMap<ParameterLocation, Vec<Parameter>>,
    pub request_body: Option<JsonSchema>,
    pub response: Option<JsonSchema>,
    /// Where the `@route` directive was written
    pub location: Location,
}

/// The routes of one service trait.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGroup {
    /// Name of the service trait
    pub name: String,
    pub description: String,
    pub base_path: String,
    /// Routes in declaration order, keyed by method name
    pub routes: IndexMap<String, RouteDescriptor>,
}

/// Route collector - turns service traits into route groups.
///
/// Runs after the struct catalog is sealed and schema definitions exist, so request and
/// response schemas can refer to definitions by id.
pub struct RouteCollector<'c, 'a> {
    compiler: &'c mut SchemaCompiler<'a>,
}

impl<'c, 'a> RouteCollector<'c, 'a> {
    pub fn new(compiler: &'c mut SchemaCompiler<'a>) -> Self {
        Self { compiler }
    }

    /// Collects the route groups of all files, in file order then declaration order.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed directive, missing `@route` or invalid handler
    /// signature.
    pub fn collect(&mut self, files: &[ParsedFile]) -> Result<Vec<RouteGroup>> {
        let mut groups = Vec::new();
        for file in files {
            for item in file.declarations().traits {
                if item.ident.unraw().to_string().ends_with(SERVICE_SUFFIX) {
                    groups.push(self.collect_group(file, item)?);
                }
            }
        }

        info!(
            "Collected {} route groups with {} routes",
            groups.len(),
            groups.iter().map(|g| g.routes.len()).sum::<usize>()
        );
        Ok(groups)
    }

    fn collect_group(&mut self, file: &ParsedFile, item: &ItemTrait) -> Result<RouteGroup> {
        let name = item.ident.unraw().to_string();
        debug!("Collecting route group {} from {}", name, file.path.display());

        let mut base_path = String::new();
        let mut description = Vec::new();
        for line in doc_lines(&item.attrs, &file.path) {
            match line.directive(&name)? {
                Some(Directive::Group(path)) => base_path = path.to_string(),
                Some(_) => description.push(line.text.clone()),
                None => {}
            }
        }

        let mut routes = IndexMap::new();
        for trait_item in &item.items {
            let TraitItem::Fn(method) = trait_item else {
                continue;
            };
            let route = self.collect_route(file, &name, method)?;
            routes.insert(route.name.clone(), route);
        }

        Ok(RouteGroup {
            name,
            description: description.join("\n"),
            base_path,
            routes,
        })
    }

    fn collect_route(
        &mut self,
        file: &ParsedFile,
        group: &str,
        method: &TraitItemFn,
    ) -> Result<RouteDescriptor> {
        let name = method.sig.ident.unraw().to_string();
        let owner = format!("{}.{}", group, name);

        let mut route = None;
        let mut code = None;
        let mut description = Vec::new();
        for line in doc_lines(&method.attrs, &file.path) {
            match line.directive(&owner)? {
                Some(Directive::Route { method, path }) => {
                    if route.is_some() {
                        return Err(line.error(&owner, "duplicate @route directive".to_string()));
                    }
                    route = Some((method, path.to_string(), line.location.clone()));
                }
                Some(Directive::Code(status)) => code = Some(status),
                Some(_) => description.push(line.text.clone()),
                None => {}
            }
        }
        let (http_method, path, location) = route.ok_or_else(|| Error::MissingRoute {
            route: owner.clone(),
        })?;

        let resolver = TypeResolver::new(&file.path);
        let (input, output) = check_signature(&resolver, &owner, &method.sig)?;

        let catalog = self.compiler.catalog();
        let request = input.as_deref().and_then(|input| lookup(catalog.get(input), input));
        let response_struct = output
            .as_deref()
            .and_then(|output| lookup(catalog.get(output), output));

        let mut parameters: BTreeMap<ParameterLocation, Vec<Parameter>> = BTreeMap::new();
        let mut request_body = None;
        if let Some(request) = request {
            for field in request.fields.values().filter(|f| f.exported) {
                for location in ParameterLocation::ALL {
                    let Some(parameter_name) = field.tag.lookup(location.tag_key()) else {
                        continue;
                    };
                    if parameter_name.is_empty() {
                        warn!(
                            "{}: {} tag on {}.{} has no parameter name, skipping",
                            owner,
                            location.tag_key(),
                            request.name,
                            field.name
                        );
                        continue;
                    }
                    let (schema, required) = self.compiler.field_schema(field)?;
                    parameters.entry(location).or_default().push(Parameter {
                        name: parameter_name.to_string(),
                        schema,
                        required,
                    });
                }
            }

            if http_method != HttpMethod::Get {
                request_body = Some(self.compiler.struct_schema(request, Some(&request.name))?);
            }
        }

        let response = match response_struct {
            Some(response) => Some(self.compiler.struct_schema(response, Some(&response.name))?),
            None => None,
        };

        debug!("Collected route {} {} {}", owner, http_method, path);
        Ok(RouteDescriptor {
            name,
            method: http_method,
            path,
            description: description.join("\n"),
            code,
            input,
            output,
            parameters,
            request_body,
            response,
            location,
        })
    }
}

fn lookup<'s>(found: Option<&'s StructDescriptor>, name: &str) -> Option<&'s StructDescriptor> {
    if found.is_none() {
        debug!("No struct named {}; no schema is generated for it", name);
    }
    found
}

/// Validates a handler signature, returning its request and response type names.
fn check_signature(
    resolver: &TypeResolver,
    owner: &str,
    sig: &syn::Signature,
) -> Result<(Option<String>, Option<String>)> {
    let invalid = |reason: String| Error::Signature {
        route: owner.to_string(),
        reason,
    };

    let params: Vec<&Type> = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(pat.ty.as_ref()),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let [_, request] = params.as_slice() else {
        return Err(invalid(format!(
            "expected a context and a request parameter, found {} parameters",
            params.len()
        )));
    };

    let input = match request {
        ty if is_sentinel(ty) => None,
        Type::Reference(reference) if is_sentinel(&reference.elem) => None,
        Type::Reference(reference) => Some(named_type(resolver, &reference.elem).ok_or_else(|| {
            invalid("the request must be a reference to a struct".to_string())
        })?),
        _ => {
            return Err(invalid(
                "the request must be passed by reference (`&T`) or be `()`".to_string(),
            ))
        }
    };

    let ReturnType::Type(_, returned) = &sig.output else {
        return Err(invalid("missing return type".to_string()));
    };
    let (ok, err) = result_arguments(returned)
        .ok_or_else(|| invalid("the return type must be `Result<Response, Error>`".to_string()))?;

    if last_segment(err).as_deref() != Some(ERROR_TYPE) {
        return Err(invalid(format!("the error type must be named `{}`", ERROR_TYPE)));
    }

    let output = if is_sentinel(ok) {
        None
    } else {
        let name = named_type(resolver, ok)
            .ok_or_else(|| invalid("the response must be a struct or `()`".to_string()))?;
        (last_segment_of(&name) != EMPTY_SENTINEL).then_some(name)
    };

    Ok((input, output))
}

/// `Ok` and `Err` types of a `Result` with exactly two type arguments.
fn result_arguments(ty: &Type) -> Option<(&Type, &Type)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let types: Vec<&Type> = args
        .args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect();
    match types.as_slice() {
        [ok, err] => Some((*ok, *err)),
        _ => None,
    }
}

/// The struct name behind wrappers such as `Box`, if the type names a struct at all.
fn named_type(resolver: &TypeResolver, ty: &Type) -> Option<String> {
    match resolver.classify_shallow(ty).ok()? {
        FieldType::Named(name) | FieldType::Qualified(name) => Some(name),
        _ => None,
    }
}

fn is_sentinel(ty: &Type) -> bool {
    match ty {
        Type::Tuple(tuple) => tuple.elems.is_empty(),
        Type::Paren(paren) => is_sentinel(&paren.elem),
        _ => last_segment(ty).as_deref() == Some(EMPTY_SENTINEL),
    }
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

fn last_segment_of(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::schema_compiler::definition_id;
    use crate::struct_collector::StructCollector;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    const MODELS: &str = r#"
        pub struct GetReq {
            #[api(uri = "id", binding = "required")]
            pub id: u64,
            #[api(header = "X-Trace")]
            pub trace: String,
        }

        pub struct LookupReq {
            #[api(json = "slug", uri = "")]
            pub slug: String,
            #[api(query = "q")]
            pub q: String,
        }

        pub struct CreateReq {
            #[api(json = "name", binding = "required")]
            pub name: String,
            #[api(query = "dry_run")]
            pub dry_run: bool,
        }

        pub struct Widget {
            #[api(json = "id")]
            pub id: u64,
            #[api(json = "name")]
            pub name: String,
        }

        /// @schema
        pub struct Gadget {
            #[api(json = "id")]
            pub id: u64,
        }
    "#;

    fn collect(service: &str) -> Result<Vec<RouteGroup>> {
        let files = vec![
            AstParser::parse_source(Path::new("models.rs"), MODELS).unwrap(),
            AstParser::parse_source(Path::new("service.rs"), service).unwrap(),
        ];
        let catalog = StructCollector::collect(&files);
        let mut compiler = SchemaCompiler::new(&catalog);
        RouteCollector::new(&mut compiler).collect(&files)
    }

    fn signature_error(method: &str) -> String {
        let service = format!(
            "pub trait WidgetService {{\n    /// @route GET /x\n    {}\n}}\n",
            method
        );
        match collect(&service) {
            Err(Error::Signature { route, reason }) => {
                assert_eq!(route, "WidgetService.get");
                reason
            }
            other => panic!("expected signature error, got {:?}", other),
        }
    }

    #[test]
    fn test_single_get_route() {
        let groups = collect(
            r#"
            /// Widget catalogue.
            /// @group /widgets
            pub trait WidgetService {
                /// Fetch one widget.
                /// @route GET /{id}
                fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;
            }
            "#,
        )
        .unwrap();

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.name, "WidgetService");
        assert_eq!(group.base_path, "/widgets");
        assert_eq!(group.description, "Widget catalogue.");

        let route = &group.routes["get"];
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path, "/{id}");
        assert_eq!(route.description, "Fetch one widget.");
        assert_eq!(route.input.as_deref(), Some("GetReq"));
        assert_eq!(route.output.as_deref(), Some("Widget"));
        assert_eq!(route.location.line, 6);
        assert!(route.request_body.is_none());

        let uri = &route.parameters[&ParameterLocation::Uri];
        assert_eq!(uri.len(), 1);
        assert_eq!(uri[0].name, "id");
        assert!(uri[0].required);
        assert_eq!(route.parameters[&ParameterLocation::Header][0].name, "X-Trace");

        assert_eq!(
            serde_json::to_value(route.response.as_ref().unwrap()).unwrap(),
            json!({
                "type": "object",
                "x-apicat-order": ["id", "name"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn test_missing_route_names_the_method() {
        let err = collect(
            r#"
            /// @group /widgets
            pub trait WidgetService {
                /// @route GET /{id}
                fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;

                /// Lists widgets, but forgot its route.
                fn list(&self, ctx: Context, req: ()) -> Result<Widget, Error>;
            }
            "#,
        )
        .unwrap_err();

        assert!(matches!(&err, Error::MissingRoute { route } if route == "WidgetService.list"));
        assert!(err.to_string().contains("WidgetService.list"));
    }

    #[test]
    fn test_method_without_doc_is_missing_route() {
        let err = collect(
            "pub trait WidgetService { fn ping(&self, ctx: Context, req: ()) -> Result<(), Error>; }",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingRoute { .. }));
    }

    #[test]
    fn test_body_only_for_non_get_methods() {
        let groups = collect(
            r#"
            pub trait WidgetService {
                /// @route post /
                /// @code 201
                async fn create(&self, ctx: Context, req: &CreateReq) -> Result<Gadget, Error>;

                /// @route GET /
                fn search(&self, ctx: Context, req: &CreateReq) -> Result<(), Error>;
            }
            "#,
        )
        .unwrap();

        let create = &groups[0].routes["create"];
        assert_eq!(create.method, HttpMethod::Post);
        assert_eq!(create.code, Some(201));
        let body = serde_json::to_value(create.request_body.as_ref().unwrap()).unwrap();
        assert_eq!(body["properties"]["name"]["required"], json!(["name"]));
        assert_eq!(
            create.response.as_ref().unwrap().reference,
            Some(format!("#/definitions/schemas/{}", definition_id("Gadget")))
        );
        assert_eq!(create.parameters[&ParameterLocation::Query][0].name, "dry_run");

        let search = &groups[0].routes["search"];
        assert!(search.request_body.is_none());
        assert!(search.response.is_none());
        assert_eq!(search.output, None);
        assert_eq!(search.parameters[&ParameterLocation::Query].len(), 1);
    }

    #[test]
    fn test_location_tag_without_name_is_skipped() {
        let groups = collect(
            r#"
            pub trait WidgetService {
                /// @route GET /lookup
                fn lookup(&self, ctx: Context, req: &LookupReq) -> Result<(), Error>;
            }
            "#,
        )
        .unwrap();

        let lookup = &groups[0].routes["lookup"];
        assert!(!lookup.parameters.contains_key(&ParameterLocation::Uri));
        assert_eq!(lookup.parameters[&ParameterLocation::Query].len(), 1);
        assert_eq!(lookup.parameters[&ParameterLocation::Query][0].name, "q");
    }

    #[test]
    fn test_empty_sentinels() {
        let groups = collect(
            r#"
            pub trait WidgetService {
                /// @route DELETE /all
                fn purge(&self, ctx: Context, req: &Empty) -> Result<Box<types::Empty>, Error>;
            }
            "#,
        )
        .unwrap();

        let purge = &groups[0].routes["purge"];
        assert_eq!(purge.input, None);
        assert_eq!(purge.output, None);
        assert!(purge.request_body.is_none());
        assert!(purge.parameters.is_empty());
    }

    #[test]
    fn test_unknown_structs_have_no_schema() {
        let groups = collect(
            r#"
            pub trait WidgetService {
                /// @route PUT /
                fn put(&self, ctx: Context, req: &Missing) -> Result<api::Missing, Error>;
            }
            "#,
        )
        .unwrap();

        let put = &groups[0].routes["put"];
        assert_eq!(put.input.as_deref(), Some("Missing"));
        assert!(put.request_body.is_none());
        assert!(put.response.is_none());
    }

    #[test]
    fn test_signature_contract() {
        let cases = [
            (
                "fn get(&self, req: &GetReq) -> Result<Widget, Error>;",
                "found 1 parameters",
            ),
            (
                "fn get(&self, ctx: Context, req: GetReq) -> Result<Widget, Error>;",
                "by reference",
            ),
            (
                "fn get(&self, ctx: Context, req: &Vec<GetReq>) -> Result<Widget, Error>;",
                "reference to a struct",
            ),
            (
                "fn get(&self, ctx: Context, req: &GetReq);",
                "missing return type",
            ),
            (
                "fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget>;",
                "Result<Response, Error>",
            ),
            (
                "fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, String>;",
                "error type",
            ),
            (
                "fn get(&self, ctx: Context, req: &GetReq) -> Result<Vec<Widget>, Error>;",
                "response must be a struct",
            ),
            (
                "fn get(&self, ctx: Context, req: &GetReq) -> Result<u64, Error>;",
                "response must be a struct",
            ),
        ];

        for (method, expected) in cases {
            let reason = signature_error(method);
            assert!(reason.contains(expected), "{}: {}", method, reason);
        }
    }

    #[test]
    fn test_malformed_directives_report_location() {
        let err = collect(
            r#"pub trait WidgetService {
    /// @route GET
    fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;
}
"#,
        )
        .unwrap_err();

        match err {
            Error::Directive {
                location, owner, ..
            } => {
                assert_eq!(location.file, Path::new("service.rs"));
                assert_eq!(location.line, 2);
                assert_eq!(location.column, 9);
                assert_eq!(owner, "WidgetService.get");
            }
            other => panic!("expected directive error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_route_is_fatal() {
        let err = collect(
            r#"
            pub trait WidgetService {
                /// @route GET /a
                /// @route GET /b
                fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;
            }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate @route"));
    }

    #[test]
    fn test_misplaced_directives_are_description() {
        let groups = collect(
            r#"
            /// @route GET /nowhere
            pub trait WidgetService {
                /// @group /elsewhere
                /// @route GET /
                fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;
            }

            pub trait Helper {
                fn ignored(&self);
            }
            "#,
        )
        .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].base_path, "");
        assert_eq!(groups[0].description, "@route GET /nowhere");
        assert_eq!(groups[0].routes["get"].description, "@group /elsewhere");
    }

    #[test]
    fn test_routes_keep_declaration_order() {
        let groups = collect(
            r#"
            pub trait WidgetService {
                /// @route GET /z
                fn zeta(&self, ctx: Context, req: ()) -> Result<(), Error>;
                /// @route GET /a
                fn alpha(&self, ctx: Context, req: ()) -> Result<(), Error>;
                const VERSION: u32 = 1;
            }
            "#,
        )
        .unwrap();

        let names: Vec<&str> = groups[0].routes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_http_method_parsing() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }
}
