//! Contact-form responses: created by the public form, listed by admins.

use crate::service::{
    DefaultHooks, KeyKind, Resource, ResourceConfig, Rule, SearchOn, SortDirection,
};

const RULES: &[(&str, &[Rule])] = &[
    ("email", &[Rule::Required, Rule::Email]),
    ("subject", &[Rule::Required, Rule::Str, Rule::MaxLen(100)]),
    ("message", &[Rule::Required, Rule::Str, Rule::MaxLen(5000)]),
];

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "contact_form_responses",
            table: "contact_form_responses",
            key: KeyKind::AutoId,
            fields: &["id", "email", "subject", "message", "created_at"],
            admin_fields: &[],
            hidden: &[],
            rules: RULES,
            search_on: Some(SearchOn::Column("subject")),
            sortable: &["subject", "email", "created_at"],
            default_sort_by: "created_at",
            default_sort_direction: SortDirection::Desc,
            paginate: true,
            image_location: None,
            translations: None,
        },
        Box::new(DefaultHooks),
    )
}
