//! Geocaches placed by the club. No translations; the listing data is the
//! same in every language.

use crate::service::{
    KeyKind, PublishableHooks, Resource, ResourceConfig, Rule, SearchOn, SortDirection,
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
            Rule::Nullable,
            Rule::Str,
            Rule::UrlHttps,
            Rule::StartsWith("https://www.geocaching.com/geocache/"),
        ],
    ),
    (
        "type",
        &[
            Rule::Required,
            Rule::In(&[
                "TRADITIONAL",
                "MULTI",
                "MYSTERY",
                "EARTH",
                "LETTERBOX",
                "WHEREIGO",
                "VIRTUAL",
                "LAB",
                "WEBCAM",
            ]),
        ],
    ),
    (
        "difficulty",
        &[Rule::Required, Rule::Numeric, Rule::Between(1.0, 5.0)],
    ),
    (
        "terrain",
        &[Rule::Required, Rule::Numeric, Rule::Between(1.0, 5.0)],
    ),
    ("placed_on", &[Rule::Nullable, Rule::DateFormat("%Y-%m-%d")]),
];

pub fn resource() -> Resource {
    Resource::new(
        ResourceConfig {
            name: "geocaches",
            table: "geocaches",
            key: KeyKind::AutoId,
            fields: &["id", "title", "geolink", "type", "difficulty", "terrain"],
            admin_fields: &["state", "placed_on"],
            hidden: &["id"],
            rules: RULES,
            search_on: Some(SearchOn::Column("title")),
            sortable: &[
                "title",
                "type",
                "difficulty",
                "terrain",
                "placed_on",
                "state",
                "created_at",
                "updated_at",
            ],
            default_sort_by: "placed_on",
            default_sort_direction: SortDirection::Desc,
            paginate: true,
            image_location: None,
            translations: None,
        },
        Box::new(PublishableHooks),
    )
}
