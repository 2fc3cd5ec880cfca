//! Field tags.
//!
//! A field opts into the API surface with an `#[api(...)]` attribute holding ordered
//! `key = "value"` entries and bare flags:
//!
//! ```ignore
//! #[api(json = "name,omitempty", binding = "required", query = "name")]
//! pub name: String,
//! ```

use syn::punctuated::Punctuated;
use syn::{Attribute, LitStr, Meta, Token};

/// Attribute that carries field tags.
pub const TAG_ATTRIBUTE: &str = "api";
/// Key holding the serialization name.
pub const SERIALIZATION_KEY: &str = "json";
/// Key holding validation directives.
pub const VALIDATION_KEY: &str = "binding";
/// Flag marking a field whose struct is embedded into its host.
pub const FLATTEN_FLAG: &str = "flatten";

/// Ordered key → value metadata attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    entries: Vec<(String, String)>,
}

impl Tag {
    /// Parses every `#[api(...)]` attribute into one tag, in attribute order.
    ///
    /// Returns `Ok(None)` when the field has no tag attribute at all. Flags without a value
    /// are stored with an empty value.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Option<Tag>> {
        let mut found = false;
        let mut entries = Vec::new();

        for attr in attrs.iter().filter(|a| a.path().is_ident(TAG_ATTRIBUTE)) {
            found = true;
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(|ident| ident.to_string())
                    .ok_or_else(|| meta.error("tag keys must be plain identifiers"))?;
                let value = if meta.input.peek(Token![=]) {
                    meta.value()?.parse::<LitStr>()?.value()
                } else {
                    String::new()
                };
                entries.push((key, value));
                Ok(())
            })?;
        }

        Ok(found.then_some(Tag { entries }))
    }

    /// Builds a tag from literal entries.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the first entry named `key`, if present.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key`, or the empty string.
    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or("")
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The serialization name, ignoring options after the first comma.
    ///
    /// `None` when the name is empty or suppressed with `-`.
    pub fn serialization_name(&self) -> Option<&str> {
        let name = self.get(SERIALIZATION_KEY).split(',').next().unwrap_or("").trim();
        match name {
            "" | "-" => None,
            name => Some(name),
        }
    }

    /// Whether the validation directive contains the `required` token.
    pub fn is_required(&self) -> bool {
        self.get(VALIDATION_KEY)
            .split(|c: char| c == ',' || c.is_whitespace())
            .any(|token| token == "required")
    }
}

/// Whether a field is embedded into its host struct.
///
/// Both `#[serde(flatten)]` and the `#[api(flatten)]` flag mark an embedding. Unparsable
/// serde attributes are left to serde and do not count.
pub fn is_embedded(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        let path = attr.path();
        if !path.is_ident("serde") && !path.is_ident(TAG_ATTRIBUTE) {
            return false;
        }
        attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .map(|metas| {
                metas
                    .iter()
                    .any(|meta| matches!(meta, Meta::Path(p) if p.is_ident(FLATTEN_FLAG)))
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_ordered_entries() {
        let attrs: Vec<Attribute> = parse_quote! {
            #[api(json = "name,omitempty", binding = "required")]
            #[api(query = "q")]
        };

        let tag = Tag::from_attrs(&attrs).unwrap().unwrap();
        let entries: Vec<_> = tag.entries().collect();

        assert_eq!(
            entries,
            vec![
                ("json", "name,omitempty"),
                ("binding", "required"),
                ("query", "q")
            ]
        );
        assert_eq!(tag.serialization_name(), Some("name"));
        assert!(tag.is_required());
    }

    #[test]
    fn test_missing_tag_is_none() {
        let attrs: Vec<Attribute> = parse_quote! {
            #[serde(rename = "other")]
        };
        assert_eq!(Tag::from_attrs(&attrs).unwrap(), None);
    }

    #[test]
    fn test_malformed_tag_is_error() {
        let attrs: Vec<Attribute> = parse_quote! {
            #[api(json = 42)]
        };
        assert!(Tag::from_attrs(&attrs).is_err());
    }

    #[test]
    fn test_suppressed_and_empty_names() {
        assert_eq!(Tag::from_entries([("json", "-")]).serialization_name(), None);
        assert_eq!(Tag::from_entries([("json", ",omitempty")]).serialization_name(), None);
        assert_eq!(Tag::from_entries([("uri", "id")]).serialization_name(), None);
    }

    #[test]
    fn test_required_is_a_whole_token() {
        assert!(Tag::from_entries([("binding", "max=10,required")]).is_required());
        assert!(Tag::from_entries([("binding", "required min=1")]).is_required());
        assert!(!Tag::from_entries([("binding", "required_if=Kind 1")]).is_required());
        assert!(!Tag::default().is_required());
    }

    #[test]
    fn test_embedding_markers() {
        let serde_flatten: Vec<Attribute> = parse_quote! {
            #[serde(default, flatten)]
        };
        let api_flatten: Vec<Attribute> = parse_quote! {
            #[api(flatten)]
        };
        let renamed: Vec<Attribute> = parse_quote! {
            #[serde(rename = "flatten")]
        };

        assert!(is_embedded(&serde_flatten));
        assert!(is_embedded(&api_flatten));
        assert!(!is_embedded(&renamed));
    }
}
