use crate::error::{Error, Result};
use crate::struct_collector::{FieldDescriptor, StructCatalog, StructDescriptor};
use crate::type_resolver::{is_date_time, scalar_kind, FieldType};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Prefix of reference targets inside the document.
pub const DEFINITION_REF_PREFIX: &str = "#/definitions/schemas/";

/// A compiled schema node.
///
/// Fields serialize in the order consumers of the document expect; unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonSchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Property names in insertion order
    #[serde(rename = "x-apicat-order", skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonSchema>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<JsonSchema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl JsonSchema {
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// A reference node pointing at a definition.
    pub fn reference(id: u64) -> Self {
        Self {
            reference: Some(format!("{}{}", DEFINITION_REF_PREFIX, id)),
            ..Self::typed("object")
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// A reusable, referenced schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub id: u64,
    pub name: String,
    pub schema: JsonSchema,
}

/// Definition id of a struct name: `len * 10000 + sum of bytes`.
///
/// Pure and name-only. Different names may share an id, and nothing detects it.
pub fn definition_id(name: &str) -> u64 {
    name.len() as u64 * 10000 + name.bytes().map(u64::from).sum::<u64>()
}

/// Schema compiler - converts struct and field descriptors into schema trees.
///
/// Schema-eligible structs are emitted as references wherever they are used by name, so
/// recursion through them terminates. Any other named struct is inlined at each use site;
/// inlining a struct that is already being inlined further up is an error.
pub struct SchemaCompiler<'a> {
    catalog: &'a StructCatalog,
    /// Named structs currently being inlined
    stack: Vec<String>,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(catalog: &'a StructCatalog) -> Self {
        Self {
            catalog,
            stack: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &'a StructCatalog {
        self.catalog
    }

    /// Compiles every schema-eligible struct into a definition, in name order.
    pub fn definitions(&mut self) -> Result<Vec<SchemaDefinition>> {
        let catalog = self.catalog;
        let mut definitions = Vec::new();
        for descriptor in catalog.iter().filter(|d| d.is_schema_definition) {
            debug!("Compiling schema definition {}", descriptor.name);
            definitions.push(SchemaDefinition {
                id: definition_id(&descriptor.name),
                name: descriptor.name.clone(),
                schema: self.inline(descriptor, Some(&descriptor.name))?,
            });
        }

        info!("Compiled {} schema definitions", definitions.len());
        Ok(definitions)
    }

    /// Compiles a struct into a schema.
    ///
    /// With a name and a schema-eligible struct this is always a reference node; otherwise
    /// the struct is inlined as an object.
    pub fn struct_schema(
        &mut self,
        descriptor: &StructDescriptor,
        name: Option<&str>,
    ) -> Result<JsonSchema> {
        match name {
            Some(name) if descriptor.is_schema_definition => {
                Ok(JsonSchema::reference(definition_id(name)))
            }
            _ => self.inline(descriptor, name),
        }
    }

    /// Compiles a field into its schema and whether it is required.
    pub fn field_schema(&mut self, field: &FieldDescriptor) -> Result<(JsonSchema, bool)> {
        let mut schema = self.type_schema(&field.ty)?;
        if !field.doc.is_empty() {
            schema.description = field.doc.clone();
        }
        Ok((schema, field.tag.is_required()))
    }

    fn inline(&mut self, descriptor: &StructDescriptor, name: Option<&str>) -> Result<JsonSchema> {
        let Some(name) = name else {
            return self.object_schema(descriptor);
        };

        if self.stack.iter().any(|entry| entry == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(Error::RecursiveSchema {
                chain: chain.join(" -> "),
            });
        }

        self.stack.push(name.to_string());
        let schema = self.object_schema(descriptor);
        self.stack.pop();
        schema
    }

    fn object_schema(&mut self, descriptor: &StructDescriptor) -> Result<JsonSchema> {
        let mut schema = JsonSchema::typed("object");

        for field in descriptor.fields.values() {
            if !field.exported {
                continue;
            }
            let Some(name) = field.tag.serialization_name() else {
                continue;
            };

            let (mut property, required) = self.field_schema(field)?;
            if required {
                property.required = vec![name.to_string()];
            }
            schema.order.push(name.to_string());
            schema.properties.insert(name.to_string(), property);
        }

        Ok(schema)
    }

    fn type_schema(&mut self, ty: &FieldType) -> Result<JsonSchema> {
        let catalog = self.catalog;
        let schema = match ty {
            FieldType::Scalar(name) => match scalar_kind(name) {
                Some(kind) => JsonSchema::typed(kind.as_str()),
                None => JsonSchema::default(),
            },
            FieldType::Qualified(name) | FieldType::Named(name) if is_date_time(name) => {
                JsonSchema {
                    format: Some("date-time".to_string()),
                    ..JsonSchema::typed("string")
                }
            }
            FieldType::Qualified(name) | FieldType::Named(name) => match catalog.get(name) {
                Some(descriptor) => self.struct_schema(descriptor, Some(&descriptor.name))?,
                None => {
                    debug!("No struct named {}; emitting an empty schema", name);
                    JsonSchema::default()
                }
            },
            FieldType::Map(_) => JsonSchema {
                additional_properties: Some(Box::new(JsonSchema::typed("any"))),
                ..JsonSchema::typed("object")
            },
            FieldType::Array(Some(element)) if element.is_byte() => JsonSchema::typed("string"),
            FieldType::Array(element) => {
                let items = match element {
                    Some(element) => self.type_schema(element)?,
                    None => JsonSchema::default(),
                };
                JsonSchema {
                    items: Some(Box::new(items)),
                    ..JsonSchema::typed("array")
                }
            }
            FieldType::Struct(inner) => self.struct_schema(inner, None)?,
        };
        Ok(schema)
    }
}
