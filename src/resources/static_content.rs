//! Static translated site content: one property (a named slot on the site)
//! with a content row per language. The site fetches every language at once
//! to build its dictionaries, so the public view is not filtered by lang.

use crate::service::{
    KeyKind, Record, Resource, ResourceConfig, ResourceHooks, Rule, SearchOn, SortDirection,
    TranslationSpec,
};
use serde_json::{json, Value};

const RULES: &[(&str, &[Rule])] = &[
    ("property", &[Rule::Required, Rule::Str, Rule::MaxLen(100)]),
    ("image", &[Rule::Nullable, Rule::Image { max_kb: 4096 }]),
];

struct StaticContentHooks;

impl ResourceHooks for StaticContentHooks {
    /// There is exactly one image per property, so the name is fixed and a
    /// re-upload replaces it.
    fn image_name(&self, data: &Record, extension: &str) -> String {
        let property = data
            .get("property")
            .and_then(|v| v.as_str())
            .unwrap_or("content");
        format!("{}.{}", property, extension)
    }

    /// An image-valued property carries the URL as its content in every
    /// language at once.
    fn save_image_url(&self, data: &mut Record, url: &str, languages: &[String]) {
        let rows: Vec<Value> = languages
            .iter()
            .map(|code| json!({"lang_code": code, "content": url}))
            .collect();
        data.insert("contents".to_string(), Value::Array(rows));
    }
}

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "static",
            table: "static_site_properties",
            key: KeyKind::Natural("property"),
            fields: &["property"],
            admin_fields: &[],
            hidden: &[],
            rules: RULES,
            search_on: Some(SearchOn::Column("property")),
            sortable: &["property"],
            default_sort_by: "property",
            default_sort_direction: SortDirection::Desc,
            paginate: false,
            image_location: Some("static"),
            translations: Some(TranslationSpec {
                table: "static_site_contents",
                parent_column: "property",
                payload_key: "contents",
                fields: &["content"],
                public_filters_by_lang: false,
            }),
        },
        Box::new(StaticContentHooks),
    )
}
