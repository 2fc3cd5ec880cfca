//! Doc-comment annotations.
//!
//! Declarations are annotated with directive lines inside their doc comments:
//!
//! ```text
//! /// Widgets in the catalogue.
//! /// @group /widgets
//! pub trait WidgetService {
//!     /// Fetch one widget.
//!     /// @route GET /{id}
//!     /// @code 200
//!     fn get(&self, ctx: Context, req: &GetReq) -> Result<Widget, Error>;
//! }
//! ```
//!
//! A line is a directive when its first whitespace-separated token is exactly one of
//! `@group`, `@route`, `@code` or `@schema`. Every other non-empty line is description text.

use crate::error::{Error, Location, Result};
use crate::route_collector::HttpMethod;
use std::path::Path;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Lit, Meta};

/// Width of the `///` marker preceding doc text on a source line.
const DOC_MARKER_WIDTH: usize = 3;

/// One line of doc text and where it starts in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub text: String,
    pub location: Location,
}

/// A parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `@group <basePath>`
    Group(&'a str),
    /// `@route <METHOD> <path>`
    Route { method: HttpMethod, path: &'a str },
    /// `@code <status>`
    Code(u16),
    /// `@schema`
    Schema,
    /// Plain description text.
    Text(&'a str),
}

/// Extracts the doc lines of a declaration from its `doc` attributes.
///
/// Each `///` comment is its own attribute, so every line keeps the source line it came
/// from. Columns assume the `///` form.
pub fn doc_lines(attrs: &[Attribute], file: &Path) -> Vec<DocLine> {
    let mut lines = Vec::new();

    for attr in attrs.iter().filter(|a| a.path().is_ident("doc")) {
        let Meta::NameValue(name_value) = &attr.meta else {
            continue;
        };
        let Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) = &name_value.value
        else {
            continue;
        };

        let start = attr.span().start();
        for (offset, raw) in lit.value().split('\n').enumerate() {
            let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
            let column = if offset == 0 {
                start.column + 1 + DOC_MARKER_WIDTH + indent
            } else {
                indent + 1
            };
            lines.push(DocLine {
                text: raw.trim().to_string(),
                location: Location::new(file, start.line + offset, column),
            });
        }
    }

    lines
}

/// Joins doc lines into a single text, dropping leading and trailing blank lines.
pub fn doc_text(lines: &[DocLine]) -> String {
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    let first = texts.iter().position(|t| !t.is_empty());
    let last = texts.iter().rposition(|t| !t.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => texts[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Whether any doc line starts with the `@schema` marker.
pub fn has_schema_marker(lines: &[DocLine]) -> bool {
    lines
        .iter()
        .any(|line| line.text.split_whitespace().next() == Some("@schema"))
}

impl DocLine {
    /// Parses this line, `None` for blank lines.
    ///
    /// `owner` names the group or route the line belongs to and is only used in errors.
    pub fn directive(&self, owner: &str) -> Result<Option<Directive<'_>>> {
        let text = self.text.trim();
        let mut tokens = text.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = tokens.collect();

        let directive = match keyword {
            "@group" => match args.as_slice() {
                [path] => Directive::Group(*path),
                _ => {
                    return Err(self.error(
                        owner,
                        format!("@group expects exactly one <basePath>, found `{}`", text),
                    ))
                }
            },
            "@route" => match args.as_slice() {
                [method, path] => {
                    let method = method.parse::<HttpMethod>().map_err(|_| {
                        self.error(owner, format!("unknown HTTP method `{}` in `{}`", method, text))
                    })?;
                    Directive::Route { method, path: *path }
                }
                _ => {
                    return Err(self.error(
                        owner,
                        format!("@route expects exactly <METHOD> <path>, found `{}`", text),
                    ))
                }
            },
            "@code" => match args.as_slice() {
                [code] => {
                    let status = code
                        .parse::<u16>()
                        .ok()
                        .filter(|status| (100..=599).contains(status))
                        .ok_or_else(|| {
                            self.error(
                                owner,
                                format!("@code expects an HTTP status, found `{}`", code),
                            )
                        })?;
                    Directive::Code(status)
                }
                _ => {
                    return Err(self.error(
                        owner,
                        format!("@code expects exactly one status code, found `{}`", text),
                    ))
                }
            },
            "@schema" => Directive::Schema,
            _ => Directive::Text(text),
        };

        Ok(Some(directive))
    }

    pub(crate) fn error(&self, owner: &str, message: String) -> Error {
        Error::Directive {
            location: self.location.clone(),
            owner: owner.to_string(),
            message,
        }
    }
}
