//! Widget catalogue models.

use std::collections::HashMap;

/// Audit columns shared by stored records.
pub struct Audited {
    /// Record identifier.
    #[api(json = "id")]
    pub id: String,
    #[api(json = "created_at")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A catalogue widget.
/// @schema
pub struct Widget {
    #[serde(flatten)]
    pub audit: Audited,
    /// Widget identifier.
    #[api(json = "id", binding = "required")]
    pub id: u64,
    #[api(json = "name")]
    pub name: String,
    #[api(json = "tags")]
    pub tags: Vec<String>,
    #[api(json = "attributes")]
    pub attributes: HashMap<String, String>,
    pub cache_key: String,
}

pub struct GetWidgetReq {
    #[api(uri = "id", binding = "required")]
    pub id: u64,
    #[api(header = "X-Tenant")]
    pub tenant: String,
}

pub struct CreateWidgetReq {
    #[api(json = "name", binding = "required")]
    pub name: String,
    #[api(json = "thumbnail")]
    pub thumbnail: Vec<u8>,
    #[api(query = "dry_run")]
    pub dry_run: Option<bool>,
}

pub struct WidgetPage {
    #[api(json = "items")]
    pub items: Vec<Widget>,
    #[api(json = "next")]
    pub next: Option<String>,
}
