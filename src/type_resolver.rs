use crate::error::{Error, Result};
use crate::struct_collector::{collect_fields, StructDescriptor};
use log::debug;
use quote::ToTokens;
use std::path::Path;
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::{Field, GenericArgument, PathArguments, Token, Type};

/// Macro name for inline nested struct literals in type position.
pub const INLINE_STRUCT_MACRO: &str = "object";

/// Wrappers that are transparently unwrapped to their pointee.
const POINTER_WRAPPERS: &[&str] = &["Box", "Option", "Rc", "Arc", "Cow"];
/// Sequence containers, classified as arrays.
const SEQUENCES: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet"];
/// Dictionary containers, classified as maps.
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];
/// Standard library roots under which primitives may be spelled out in full.
const STD_ROOTS: &[&str] = &["std", "core", "alloc"];
/// Standard library modules re-exporting primitives.
const STD_MODULES: &[&str] = &["primitive", "string"];

/// Canonical classification of a field's type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A recognised primitive such as `u64` or `String`.
    Scalar(String),
    /// A namespaced path such as `chrono::DateTime`, kept as an opaque name.
    Qualified(String),
    /// A bare identifier that is not a primitive; resolved against the struct table later.
    Named(String),
    /// A sequence; the element is `None` when only the top-level kind was requested or
    /// the element could not be classified.
    Array(Option<Box<FieldType>>),
    /// A dictionary; only the value type is kept.
    Map(Option<Box<FieldType>>),
    /// An inline `object! { ... }` struct literal.
    Struct(Box<StructDescriptor>),
}

/// Schema vocabulary for primitive scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
        }
    }
}

impl FieldType {
    /// The name used for signature checks and struct lookups.
    pub fn type_name(&self) -> &str {
        match self {
            FieldType::Scalar(name) | FieldType::Qualified(name) | FieldType::Named(name) => name,
            FieldType::Array(_) => "array",
            FieldType::Map(_) => "map",
            FieldType::Struct(_) => "struct",
        }
    }

    /// Whether this is a byte scalar, whose sequences serialize as base64 strings.
    pub fn is_byte(&self) -> bool {
        matches!(self, FieldType::Scalar(name) if name == "u8")
    }
}

/// Maps a primitive type name to its schema kind.
pub fn scalar_kind(name: &str) -> Option<ScalarKind> {
    match name {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => Some(ScalarKind::Integer),
        "f32" | "f64" => Some(ScalarKind::Number),
        "String" | "str" | "char" => Some(ScalarKind::String),
        "bool" => Some(ScalarKind::Boolean),
        _ => None,
    }
}

/// Whether a type name denotes a well-known date/time type, by its last path segment.
pub fn is_date_time(name: &str) -> bool {
    matches!(
        name.rsplit("::").next().unwrap_or(name),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime"
    )
}

/// Type resolver - classifies type expressions of one declaration file.
pub struct TypeResolver<'a> {
    file: &'a Path,
}

impl<'a> TypeResolver<'a> {
    pub fn new(file: &'a Path) -> Self {
        Self { file }
    }

    /// The declaration file being resolved.
    pub fn file(&self) -> &Path {
        self.file
    }

    /// Classifies a type expression, recursing into elements, map values and inline structs.
    pub fn classify(&self, ty: &Type) -> Result<FieldType> {
        self.classify_with(ty, false)
    }

    /// Classifies only the top-level kind of a type expression.
    pub fn classify_shallow(&self, ty: &Type) -> Result<FieldType> {
        self.classify_with(ty, true)
    }

    fn classify_with(&self, ty: &Type, shallow: bool) -> Result<FieldType> {
        match ty {
            Type::Path(type_path) if type_path.qself.is_none() => {
                self.classify_path(ty, &type_path.path, shallow)
            }
            Type::Reference(reference) => self.classify_with(&reference.elem, shallow),
            Type::Ptr(pointer) => self.classify_with(&pointer.elem, shallow),
            Type::Paren(paren) => self.classify_with(&paren.elem, shallow),
            Type::Group(group) => self.classify_with(&group.elem, shallow),
            Type::Array(array) => Ok(FieldType::Array(
                self.element(Some(array.elem.as_ref()), shallow),
            )),
            Type::Slice(slice) => Ok(FieldType::Array(
                self.element(Some(slice.elem.as_ref()), shallow),
            )),
            Type::Macro(type_macro) if type_macro.mac.path.is_ident(INLINE_STRUCT_MACRO) => {
                if shallow {
                    return Ok(FieldType::Struct(Box::default()));
                }
                let fields = type_macro
                    .mac
                    .parse_body_with(parse_inline_fields)
                    .map_err(|e| Error::UnsupportedType {
                        ty: format!("{}! body: {}", INLINE_STRUCT_MACRO, e),
                    })?;
                Ok(FieldType::Struct(Box::new(collect_fields(
                    self,
                    INLINE_STRUCT_MACRO,
                    fields.iter(),
                ))))
            }
            _ => Err(unsupported(ty)),
        }
    }

    fn classify_path(&self, ty: &Type, path: &syn::Path, shallow: bool) -> Result<FieldType> {
        let last = path.segments.last().ok_or_else(|| unsupported(ty))?;
        let ident = last.ident.to_string();
        let type_args: Vec<&Type> = match &last.arguments {
            PathArguments::AngleBracketed(args) => args
                .args
                .iter()
                .filter_map(|arg| match arg {
                    GenericArgument::Type(inner) => Some(inner),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        if POINTER_WRAPPERS.contains(&ident.as_str()) {
            let inner = type_args.first().ok_or_else(|| unsupported(ty))?;
            return self.classify_with(inner, shallow);
        }
        if SEQUENCES.contains(&ident.as_str()) {
            return Ok(FieldType::Array(self.element(type_args.first().copied(), shallow)));
        }
        if MAPS.contains(&ident.as_str()) {
            return Ok(FieldType::Map(self.element(type_args.get(1).copied(), shallow)));
        }

        if path.segments.len() > 1 {
            if scalar_kind(&ident).is_some() && is_std_prefix(path) {
                return Ok(FieldType::Scalar(ident));
            }
            let qualified = path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            return Ok(FieldType::Qualified(qualified));
        }

        if scalar_kind(&ident).is_some() {
            Ok(FieldType::Scalar(ident))
        } else {
            Ok(FieldType::Named(ident))
        }
    }

    fn element(&self, ty: Option<&Type>, shallow: bool) -> Option<Box<FieldType>> {
        if shallow {
            return None;
        }
        match self.classify_with(ty?, false) {
            Ok(element) => Some(Box::new(element)),
            Err(e) => {
                debug!("Dropping element type in {}: {}", self.file.display(), e);
                None
            }
        }
    }
}

/// `std::string::String`, `core::primitive::u64`, `std::u8` and the like.
fn is_std_prefix(path: &syn::Path) -> bool {
    let prefix: Vec<String> = path
        .segments
        .iter()
        .take(path.segments.len() - 1)
        .map(|segment| segment.ident.to_string())
        .collect();
    match prefix.as_slice() {
        [root] => STD_ROOTS.contains(&root.as_str()),
        [root, module] => {
            STD_ROOTS.contains(&root.as_str()) && STD_MODULES.contains(&module.as_str())
        }
        _ => false,
    }
}

fn parse_inline_fields(input: ParseStream) -> syn::Result<Punctuated<Field, Token![,]>> {
    Punctuated::parse_terminated_with(input, Field::parse_named)
}

fn unsupported(ty: &Type) -> Error {
    Error::UnsupportedType {
        ty: ty.to_token_stream().to_string(),
    }
}
