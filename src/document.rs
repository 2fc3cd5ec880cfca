use crate::route_collector::{
    HttpMethod, Parameter, ParameterLocation, RouteDescriptor, RouteGroup,
};
use crate::schema_compiler::{definition_id, JsonSchema, SchemaDefinition};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document format version.
pub const APICAT_VERSION: &str = "2.0";
/// Media type under which request and response schemas are listed.
pub const CONTENT_TYPE: &str = "application/json";
/// Status reported for routes without `@code`.
pub const DEFAULT_STATUS: u16 = 200;
const SUCCESS_DESCRIPTION: &str = "success";
const CATEGORY_TYPE: &str = "category";
const HTTP_TYPE: &str = "http";

/// The apicat document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub apicat: String,
    pub info: serde_json::Map<String, serde_json::Value>,
    pub servers: Vec<serde_json::Value>,
    pub definitions: Definitions,
    pub collections: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    pub schemas: Vec<SchemaDefinition>,
}

/// One route group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub items: Vec<Item>,
}

/// One route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub id: u64,
    pub parentid: u64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub content: Vec<ContentNode>,
}

/// The URL, request and response nodes of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attrs")]
pub enum ContentNode {
    #[serde(rename = "apicat-http-url")]
    Url(UrlAttrs),
    #[serde(rename = "apicat-http-request")]
    Request(RequestAttrs),
    #[serde(rename = "apicat-http-response")]
    Response(ResponseAttrs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlAttrs {
    /// Base path of the group followed by the route path
    pub path: String,
    pub method: HttpMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAttrs {
    pub parameters: BTreeMap<ParameterLocation, Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaContent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAttrs {
    pub list: Vec<ResponseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub code: u16,
    pub description: String,
    pub content: IndexMap<String, MediaContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    pub schema: JsonSchema,
}

/// Document assembler - combines definitions and route groups into one document.
pub struct DocumentAssembler;

impl DocumentAssembler {
    /// Builds the document. Categories follow group order and items follow route order.
    pub fn assemble(definitions: &[SchemaDefinition], groups: &[RouteGroup]) -> ApiDocument {
        debug!(
            "Assembling document with {} definitions and {} groups",
            definitions.len(),
            groups.len()
        );

        ApiDocument {
            apicat: APICAT_VERSION.to_string(),
            info: serde_json::Map::new(),
            servers: Vec::new(),
            definitions: Definitions {
                schemas: definitions.to_vec(),
            },
            collections: groups.iter().map(Self::category).collect(),
        }
    }

    fn category(group: &RouteGroup) -> Category {
        let id = definition_id(&group.name);
        Category {
            title: group.description.clone(),
            id,
            node_type: CATEGORY_TYPE.to_string(),
            items: group
                .routes
                .iter()
                .map(|(method_name, route)| Item {
                    title: route.description.clone(),
                    // group name + method name keeps ids distinct across groups
                    id: definition_id(&format!("{}{}", group.name, method_name)),
                    parentid: id,
                    node_type: HTTP_TYPE.to_string(),
                    content: Self::content(&group.base_path, route),
                })
                .collect(),
        }
    }

    fn content(base_path: &str, route: &RouteDescriptor) -> Vec<ContentNode> {
        let url = UrlAttrs {
            path: format!("{}{}", base_path, route.path),
            method: route.method,
        };
        let request = RequestAttrs {
            parameters: route.parameters.clone(),
            content: route.request_body.clone().map(media),
        };
        let response = ResponseEntry {
            code: route.code.unwrap_or(DEFAULT_STATUS),
            description: SUCCESS_DESCRIPTION.to_string(),
            content: route.response.clone().map(media).unwrap_or_default(),
        };

        vec![
            ContentNode::Url(url),
            ContentNode::Request(request),
            ContentNode::Response(ResponseAttrs {
                list: vec![response],
            }),
        ]
    }
}

fn media(schema: JsonSchema) -> IndexMap<String, MediaContent> {
    IndexMap::from([(CONTENT_TYPE.to_string(), MediaContent { schema })])
}
