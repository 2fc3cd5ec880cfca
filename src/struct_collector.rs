use crate::annotation::{doc_lines, doc_text, has_schema_marker};
use crate::parser::ParsedFile;
use crate::tag::{is_embedded, Tag};
use crate::type_resolver::{FieldType, TypeResolver};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use syn::ext::IdentExt;
use syn::{Field, Fields, ItemStruct, Visibility};

/// A tagged field of a struct declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: FieldType,
    pub tag: Tag,
    /// Doc comment of the field
    pub doc: String,
    /// Whether the field is declared `pub`
    pub exported: bool,
}

/// A collected struct declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructDescriptor {
    pub name: String,
    /// Fields in declaration order; embedded fields follow the direct ones once sealed.
    pub fields: IndexMap<String, FieldDescriptor>,
    /// Set by an `@schema` line in the struct's doc comment.
    pub is_schema_definition: bool,
    /// Embedded struct names still waiting to be merged.
    pub embeds: Vec<String>,
}

/// Collects struct declarations in two phases.
///
/// Phase one ([`collect_file`](Self::collect_file)) records the direct fields of every
/// struct and queues its embeddings. Phase two ([`seal`](Self::seal)) runs once every file
/// has been collected and merges embedded fields, so declaration order across files does
/// not matter.
#[derive(Default)]
pub struct StructCollector {
    structs: BTreeMap<String, StructDescriptor>,
}

/// The sealed, read-only struct table handed to the schema and route phases.
#[derive(Debug, Default)]
pub struct StructCatalog {
    structs: BTreeMap<String, StructDescriptor>,
}

impl StructCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects and seals the structs of all files.
    pub fn collect(files: &[ParsedFile]) -> StructCatalog {
        let mut collector = Self::new();
        for file in files {
            collector.collect_file(file);
        }
        collector.seal()
    }

    /// Phase one for a single file.
    pub fn collect_file(&mut self, file: &ParsedFile) {
        let resolver = TypeResolver::new(&file.path);
        for item in file.declarations().structs {
            self.collect_struct(&resolver, item);
        }
    }

    fn collect_struct(&mut self, resolver: &TypeResolver, item: &ItemStruct) {
        let name = item.ident.unraw().to_string();
        let Fields::Named(named) = &item.fields else {
            debug!("Skipping struct {} without named fields", name);
            return;
        };

        let mut descriptor = collect_fields(resolver, &name, named.named.iter());
        if descriptor.fields.is_empty() && descriptor.embeds.is_empty() {
            debug!("Skipping struct {}: no tagged fields", name);
            return;
        }
        descriptor.is_schema_definition =
            has_schema_marker(&doc_lines(&item.attrs, resolver.file()));

        debug!(
            "Collected struct {} ({} fields, {} embedded)",
            name,
            descriptor.fields.len(),
            descriptor.embeds.len()
        );
        if self.structs.insert(name.clone(), descriptor).is_some() {
            warn!(
                "Struct {} is declared more than once; the declaration in {} wins",
                name,
                resolver.file().display()
            );
        }
    }

    /// Phase two: merges embedded fields and seals the table.
    ///
    /// Embedded structs are finalized before their hosts, so chains of embeddings resolve
    /// completely. A directly defined field is never replaced by an embedded one.
    pub fn seal(mut self) -> StructCatalog {
        let names: Vec<String> = self.structs.keys().cloned().collect();
        let mut sealed = HashSet::new();
        for name in &names {
            self.finalize(name, &mut sealed, &mut Vec::new());
        }

        info!("Collected {} structs", self.structs.len());
        StructCatalog {
            structs: self.structs,
        }
    }

    fn finalize(&mut self, name: &str, sealed: &mut HashSet<String>, stack: &mut Vec<String>) {
        if sealed.contains(name) {
            return;
        }
        let Some(mut descriptor) = self.structs.remove(name) else {
            return;
        };

        stack.push(name.to_string());
        self.merge_embeds(&mut descriptor, sealed, stack);
        stack.pop();

        self.structs.insert(name.to_string(), descriptor);
        sealed.insert(name.to_string());
    }

    fn merge_embeds(
        &mut self,
        descriptor: &mut StructDescriptor,
        sealed: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) {
        for target in std::mem::take(&mut descriptor.embeds) {
            if stack.contains(&target) {
                warn!(
                    "Embedding cycle {} -> {}; the embedding is ignored",
                    stack.join(" -> "),
                    target
                );
                continue;
            }
            self.finalize(&target, sealed, stack);

            let Some(embedded) = self.structs.get(&target) else {
                debug!(
                    "Embedded struct {} of {} is unknown and contributes no fields",
                    target, descriptor.name
                );
                continue;
            };
            for (field_name, field) in &embedded.fields {
                if !descriptor.fields.contains_key(field_name) {
                    descriptor.fields.insert(field_name.clone(), field.clone());
                }
            }
        }

        for field in descriptor.fields.values_mut() {
            self.merge_nested(&mut field.ty, sealed, stack);
        }
    }

    fn merge_nested(
        &mut self,
        ty: &mut FieldType,
        sealed: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) {
        match ty {
            FieldType::Struct(inner) => self.merge_embeds(inner, sealed, stack),
            FieldType::Array(Some(element)) | FieldType::Map(Some(element)) => {
                self.merge_nested(element, sealed, stack)
            }
            _ => {}
        }
    }
}

/// Collects the tagged fields of a struct body and queues its embeddings.
///
/// Shared by top-level declarations and inline `object!` literals. Fields without a tag are
/// not part of the API surface; fields with a malformed tag or an unclassifiable type are
/// skipped with a warning.
pub(crate) fn collect_fields<'f>(
    resolver: &TypeResolver,
    owner: &str,
    fields: impl IntoIterator<Item = &'f Field>,
) -> StructDescriptor {
    let mut descriptor = StructDescriptor {
        name: owner.to_string(),
        ..Default::default()
    };

    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.unraw().to_string();

        if is_embedded(&field.attrs) {
            match resolver.classify_shallow(&field.ty) {
                Ok(FieldType::Named(target)) | Ok(FieldType::Qualified(target)) => {
                    let target = target.rsplit("::").next().unwrap_or(&target).to_string();
                    descriptor.embeds.push(target);
                }
                Ok(other) => warn!(
                    "{}: embedded field {}.{} is a {}, not a struct; skipping",
                    resolver.file().display(),
                    owner,
                    name,
                    other.type_name()
                ),
                Err(e) => warn!(
                    "{}: skipping embedded field {}.{}: {}",
                    resolver.file().display(),
                    owner,
                    name,
                    e
                ),
            }
            continue;
        }

        let tag = match Tag::from_attrs(&field.attrs) {
            Ok(Some(tag)) if !tag.is_empty() => tag,
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    "{}: skipping field {}.{} with malformed tag: {}",
                    resolver.file().display(),
                    owner,
                    name,
                    e
                );
                continue;
            }
        };

        let ty = match resolver.classify(&field.ty) {
            Ok(ty) => ty,
            Err(e) => {
                warn!(
                    "{}: skipping field {}.{}: {}",
                    resolver.file().display(),
                    owner,
                    name,
                    e
                );
                continue;
            }
        };

        descriptor.fields.insert(
            name.clone(),
            FieldDescriptor {
                name,
                ty,
                tag,
                doc: doc_text(&doc_lines(&field.attrs, resolver.file())),
                exported: matches!(field.vis, Visibility::Public(_)),
            },
        );
    }

    descriptor
}

impl StructCatalog {
    /// Looks up a struct by name; qualified names resolve by their last segment.
    pub fn get(&self, name: &str) -> Option<&StructDescriptor> {
        self.structs.get(name.rsplit("::").next().unwrap_or(name))
    }

    /// All structs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &StructDescriptor> {
        self.structs.values()
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}
