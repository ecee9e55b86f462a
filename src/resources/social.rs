//! Social-media links shown in the site footer.

use crate::service::{
    KeyKind, Resource, ResourceConfig, ResourceHooks, Rule, SearchOn, SortDirection,
};

const RULES: &[(&str, &[Rule])] = &[
    ("name", &[Rule::Required, Rule::Str, Rule::MaxLen(70)]),
    ("url", &[Rule::Required, Rule::UrlHttps]),
    ("image", &[Rule::Nullable, Rule::Image { max_kb: 4096 }]),
];

/// Socials are always public, but admins still get the `id` back for edits.
struct SocialHooks;

impl ResourceHooks for SocialHooks {
    fn admin_visible(&self) -> &'static [&'static str] {
        &["id"]
    }
}

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "socials",
            table: "socials",
            key: KeyKind::AutoId,
            fields: &["id", "name", "url", "image_url"],
            admin_fields: &[],
            hidden: &["id"],
            rules: RULES,
            search_on: Some(SearchOn::Column("name")),
            sortable: &["name", "url", "created_at"],
            default_sort_by: "name",
            default_sort_direction: SortDirection::Desc,
            paginate: false,
            image_location: Some("socials"),
            translations: None,
        },
        Box::new(SocialHooks),
    )
}
