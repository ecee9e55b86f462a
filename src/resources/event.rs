//! Club events: published on the site, optionally pinned to the home page.

use crate::db::Database;
use crate::error::ServiceError;
use crate::service::{
    KeyKind, PublishableHooks, Record, Resource, ResourceConfig, Rule, SearchOn, SortDirection,
    TranslationSpec,
};

const RULES: &[(&str, &[Rule])] = &[
    (
        "state",
        &[Rule::Required, Rule::In(&["ONLINE", "DRAFT", "ARCHIVED"])],
    ),
    ("title", &[Rule::Required, Rule::Str, Rule::MaxLen(100)]),
    (
        "geolink",
        &[
            Rule::Required,
            Rule::Str,
            Rule::UrlHttps,
            Rule::StartsWith("https://www.geocaching.com/geocache/"),
        ],
    ),
    (
        "type",
        &[
            Rule::Required,
            Rule::In(&["REGULAR", "CITO", "MEGA", "GIGA", "BLOCK"]),
        ],
    ),
    (
        "location",
        &[
            Rule::Nullable,
            Rule::Matches(r"^[NS]\s\d+°\s\d+\.\d+\s[EW]\s\d+°\s\d+\.\d+$"),
        ],
    ),
    (
        "start_date",
        &[Rule::Required, Rule::DateTimeFormat("%Y-%m-%d %H:%M:%S")],
    ),
    (
        "end_date",
        &[Rule::Required, Rule::DateTimeFormat("%Y-%m-%d %H:%M:%S")],
    ),
    ("on_home", &[Rule::Nullable, Rule::In(&["true", "false"])]),
    ("ticket_purchase_url", &[Rule::Nullable, Rule::UrlHttps]),
    ("image", &[Rule::Nullable, Rule::Image { max_kb: 4096 }]),
];

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "events",
            table: "events",
            key: KeyKind::AutoId,
            fields: &[
                "id",
                "on_home",
                "title",
                "geolink",
                "type",
                "location",
                "start_date",
                "end_date",
                "image_url",
                "ticket_purchase_url",
            ],
            admin_fields: &["state"],
            hidden: &["id"],
            rules: RULES,
            search_on: Some(SearchOn::Column("title")),
            sortable: &[
                "title",
                "type",
                "start_date",
                "end_date",
                "on_home",
                "state",
                "created_at",
                "updated_at",
            ],
            default_sort_by: "start_date",
            default_sort_direction: SortDirection::Desc,
            paginate: true,
            image_location: Some("events"),
            translations: Some(TranslationSpec {
                table: "event_translations",
                parent_column: "event_id",
                payload_key: "translations",
                fields: &["description"],
                public_filters_by_lang: true,
            }),
        },
        Box::new(PublishableHooks),
    )
}

/// Events pinned to the home page, restricted to published state like every
/// other public view.
pub fn home_page_events(
    resource: &Resource,
    db: &Database,
    lang: Option<&str>,
) -> Result<Vec<Record>, ServiceError> {
    resource.list_where(db, &[("on_home", "true")], lang)
}
