//! Static per-resource configuration.
//!
//! Every CRUD resource is a total specialization of [`ResourceConfig`] plus
//! a [`ResourceHooks`](super::hooks::ResourceHooks) implementation. The
//! config is pure data; all behavior lives in the query and mutation
//! pipelines that read it.

use crate::service::hooks::ResourceHooks;
use crate::service::validate::Rule;
use std::fmt;

/// A dynamic entity record, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// How a resource is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Auto-incrementing integer `id` column.
    AutoId,
    /// Natural string key in the named column (language code, property name).
    Natural(&'static str),
}

impl KeyKind {
    pub fn column(&self) -> &'static str {
        match self {
            KeyKind::AutoId => "id",
            KeyKind::Natural(column) => column,
        }
    }
}

/// A concrete key value for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Id(i64),
    Code(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Id(id) => write!(f, "{}", id),
            Key::Code(code) => write!(f, "{}", code),
        }
    }
}

impl Key {
    /// Parse a path segment according to the resource's key kind.
    /// Non-numeric input for an auto-id resource yields `None`.
    pub fn parse(kind: KeyKind, raw: &str) -> Option<Key> {
        match kind {
            KeyKind::AutoId => raw.parse::<i64>().ok().map(Key::Id),
            KeyKind::Natural(_) => Some(Key::Code(raw.to_string())),
        }
    }

    pub fn to_sql_value(&self) -> rusqlite::types::Value {
        match self {
            Key::Id(id) => rusqlite::types::Value::Integer(*id),
            Key::Code(code) => rusqlite::types::Value::Text(code.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Parse a query-string direction, `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<SortDirection> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Which column free-text search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOn {
    /// A scalar column of the resource table.
    Column(&'static str),
    /// A column of the translation table (matched via EXISTS on any language).
    TranslationColumn(&'static str),
}

/// Shape of a resource's translation relation.
#[derive(Debug, Clone, Copy)]
pub struct TranslationSpec {
    pub table: &'static str,
    /// FK column in the translation table pointing at the parent entity.
    pub parent_column: &'static str,
    /// Key under which translations travel in payloads and output.
    pub payload_key: &'static str,
    /// Localized columns (excluding `lang_code`).
    pub fields: &'static [&'static str],
    /// Whether public queries restrict rows to the requested language.
    /// Static site content returns all languages so the site can build its
    /// dictionaries in one fetch.
    pub public_filters_by_lang: bool,
}

/// Static configuration of one CRUD resource.
pub struct ResourceConfig {
    /// URL segment and registry name, e.g. `"events"`.
    pub name: &'static str,
    pub table: &'static str,
    pub key: KeyKind,
    /// Public field allowlist (selected for everyone).
    pub fields: &'static [&'static str],
    /// Extra fields selected for admins only.
    pub admin_fields: &'static [&'static str],
    /// Fields stripped from output; hooks decide what admins get back.
    pub hidden: &'static [&'static str],
    pub rules: &'static [(&'static str, &'static [Rule])],
    pub search_on: Option<SearchOn>,
    /// Columns accepted for `sort_by`; anything else falls back to the default.
    pub sortable: &'static [&'static str],
    pub default_sort_by: &'static str,
    pub default_sort_direction: SortDirection,
    pub paginate: bool,
    /// Subdirectory under the image store, when the resource carries images.
    pub image_location: Option<&'static str>,
    pub translations: Option<TranslationSpec>,
}

impl ResourceConfig {
    /// Columns selected for the given audience. The key column is always
    /// included so translations can be attached; visibility filtering
    /// happens after the fetch.
    pub fn select_columns(&self, is_admin: bool) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = Vec::new();
        let key_column = self.key.column();
        if !self.fields.contains(&key_column) {
            columns.push(key_column);
        }
        columns.extend(self.fields);
        if is_admin {
            columns.extend(self.admin_fields);
        }
        columns
    }

    /// Columns accepted from mutation payloads. Timestamps are maintained by
    /// the service and never taken from the client.
    pub fn writable_columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .chain(self.admin_fields.iter())
            .copied()
            .filter(|column| *column != "created_at" && *column != "updated_at")
            .filter(|column| match self.key {
                // Natural keys are client-supplied; auto ids never are.
                KeyKind::AutoId => *column != "id",
                KeyKind::Natural(_) => true,
            })
            .collect()
    }

    pub fn is_sortable(&self, column: &str) -> bool {
        self.sortable.contains(&column)
    }
}

/// One resource: static configuration plus its behavioral hooks.
pub struct Resource {
    pub config: ResourceConfig,
    pub hooks: Box<dyn ResourceHooks>,
}

impl Resource {
    pub fn new(config: ResourceConfig, hooks: Box<dyn ResourceHooks>) -> Self {
        Self { config, hooks }
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }
}
