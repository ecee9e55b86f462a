//! Site messages (news items). All reader-facing text lives in the
//! translation rows; the entity itself only carries publication state.

use crate::service::{
    KeyKind, PublishableHooks, Resource, ResourceConfig, Rule, SearchOn, SortDirection,
    TranslationSpec,
};

const RULES: &[(&str, &[Rule])] = &[(
    "state",
    &[Rule::Required, Rule::In(&["ONLINE", "DRAFT", "ARCHIVED"])],
)];

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "messages",
            table: "messages",
            key: KeyKind::AutoId,
            fields: &["id", "updated_at"],
            admin_fields: &["state"],
            hidden: &["id"],
            rules: RULES,
            // The searchable title is a translated field, so matching goes
            // through the translation table.
            search_on: Some(SearchOn::TranslationColumn("title")),
            sortable: &["updated_at", "created_at", "state"],
            default_sort_by: "updated_at",
            default_sort_direction: SortDirection::Desc,
            paginate: true,
            image_location: None,
            translations: Some(TranslationSpec {
                table: "message_translations",
                parent_column: "message_id",
                payload_key: "translations",
                fields: &["title", "body"],
                public_filters_by_lang: true,
            }),
        },
        Box::new(PublishableHooks),
    )
}
