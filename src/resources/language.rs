//! Supported languages. Keyed by the 2-letter code; the flag image is
//! stored under the code's name so re-uploads replace it in place.

use crate::error::ErrorBag;
use crate::service::{
    Key, KeyKind, Record, Resource, ResourceConfig, ResourceHooks, Rule, SearchOn, SortDirection,
};

const RULES: &[(&str, &[Rule])] = &[
    ("code", &[Rule::Required, Rule::Str, Rule::MaxLen(2)]),
    ("name", &[Rule::Required, Rule::Str]),
    ("image", &[Rule::Nullable, Rule::Image { max_kb: 4096 }]),
];

struct LanguageHooks {
    default_code: String,
}

impl ResourceHooks for LanguageHooks {
    /// Flag files are named after the language code.
    fn image_name(&self, data: &Record, extension: &str) -> String {
        let code = data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("flag");
        format!("{}.{}", code, extension)
    }

    /// The default language must always exist; deleting it is rejected.
    fn guard_delete(&self, key: &Key) -> Option<ErrorBag> {
        match key {
            Key::Code(code) if code.eq_ignore_ascii_case(&self.default_code) => Some(
                ErrorBag::of("code", "The default language cannot be deleted."),
            ),
            _ => None,
        }
    }
}

pub fn resource(default_language: &str) -> Resource {
    Resource::new(
        ResourceConfig {
            name: "languages",
            table: "languages",
            key: KeyKind::Natural("code"),
            fields: &["code", "name", "image_url"],
            admin_fields: &[],
            hidden: &[],
            rules: RULES,
            search_on: Some(SearchOn::Column("code")),
            sortable: &["code", "name"],
            default_sort_by: "code",
            default_sort_direction: SortDirection::Desc,
            paginate: false,
            image_location: Some("langFlags"),
            translations: None,
        },
        Box::new(LanguageHooks {
            default_code: default_language.to_string(),
        }),
    )
}
