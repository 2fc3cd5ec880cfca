//! apicat-from-source - Route bindings and API documents from annotated Rust declarations.
//!
//! This library compiles a directory of Rust type declarations into two artifacts: route
//! registration source for an axum router and an apicat JSON document describing every
//! endpoint's path, parameters and request/response schemas.
//!
//! Structs opt fields into the API surface with `#[api(...)]` tags. Traits whose name ends
//! in `Service` declare route groups, with `@group`, `@route` and `@code` directives in their
//! doc comments. A struct whose doc comment contains `@schema` becomes a reusable definition
//! that is referenced by id instead of being inlined.
//!
//! # Architecture
//!
//! The compiler runs in strictly ordered phases:
//!
//! 1. [`scanner`] - Collects declaration files from the input directory
//! 2. [`parser`] - Parses every file into a syntax tree
//! 3. [`struct_collector`] - Collects struct declarations (with [`type_resolver`] and
//!    [`tag`]) and merges embedded fields once every struct is known
//! 4. [`schema_compiler`] - Compiles schema definitions from the sealed struct catalog
//! 5. [`route_collector`] - Parses service traits ([`annotation`]) into route groups
//! 6. [`document`] - Assembles the apicat document
//! 7. [`route_template`] and [`serializer`] - Render the output files
//!
//! [`compiler`] drives phases 1 to 5.
//!
//! # Example Usage
//!
//! ```no_run
//! use apicat_from_source::{
//!     compiler::compile_dir,
//!     route_template::RouteTemplater,
//!     serializer::serialize_json,
//! };
//! use std::path::Path;
//!
//! let compilation = compile_dir(Path::new("./src/proto")).unwrap();
//!
//! let routes = RouteTemplater::default().render(&compilation.groups).unwrap();
//! let document = serialize_json(&compilation.document()).unwrap();
//! println!("{}\n{}", routes, document);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod compiler;
pub mod document;
pub mod error;
pub mod parser;
pub mod route_collector;
pub mod route_template;
pub mod scanner;
pub mod schema_compiler;
pub mod serializer;
pub mod struct_collector;
pub mod tag;
pub mod type_resolver;
