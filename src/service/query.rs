//! Query pipeline: search, visibility, sort, translation eager-load and
//! pagination composed into one execution per request.

use crate::db::Database;
use crate::error::ServiceError;
use crate::service::resource::{Key, Record, Resource, SearchOn, SortDirection, TranslationSpec};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

/// Query-string parameters accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub lang: Option<String>,
}

/// Paginated resources return a page envelope, the rest a bare array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListResult {
    Paginated(Page),
    Complete(Vec<Record>),
}

#[derive(Debug, Serialize)]
pub struct Page {
    pub current_page: u32,
    pub data: Vec<Record>,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl Resource {
    /// List entities for the public or admin view.
    pub fn all(
        &self,
        db: &Database,
        params: &ListParams,
        is_admin: bool,
    ) -> Result<ListResult, ServiceError> {
        let config = &self.config;
        let lang = params.lang.as_deref();

        let mut where_sql = String::from(" WHERE 1=1");
        let mut binds: Vec<SqlValue> = Vec::new();

        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            match config.search_on {
                Some(SearchOn::Column(column)) => {
                    where_sql.push_str(&format!(" AND {} LIKE ?", column));
                    binds.push(SqlValue::Text(format!("%{}%", search)));
                }
                Some(SearchOn::TranslationColumn(column)) => {
                    if let Some(spec) = &config.translations {
                        where_sql.push_str(&format!(
                            " AND EXISTS (SELECT 1 FROM {trans} WHERE {trans}.{parent} = {table}.{key} AND {trans}.{column} LIKE ?)",
                            trans = spec.table,
                            parent = spec.parent_column,
                            table = config.table,
                            key = config.key.column(),
                            column = column,
                        ));
                        binds.push(SqlValue::Text(format!("%{}%", search)));
                    }
                }
                None => {}
            }
        }

        if !is_admin {
            if let Some(condition) = self.hooks.non_admin_condition() {
                where_sql.push_str(&format!(" AND {} = ?", condition.column));
                binds.push(SqlValue::Text(condition.value.to_string()));
            }
        }

        // sort_by is matched against the static allowlist; anything unknown
        // falls back to the resource default instead of reaching the query.
        let sort_by = params
            .sort_by
            .as_deref()
            .filter(|column| config.is_sortable(column))
            .unwrap_or(config.default_sort_by);
        let direction = params
            .sort_direction
            .as_deref()
            .and_then(SortDirection::parse)
            .unwrap_or(config.default_sort_direction);

        let columns = config.select_columns(is_admin);
        let select_sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} {}",
            columns.join(", "),
            config.table,
            where_sql,
            sort_by,
            direction.as_sql()
        );

        let conn = db.lock();

        if config.paginate {
            let per_page = params
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE);
            let page = params.page.unwrap_or(1).max(1);

            let count_sql = format!("SELECT COUNT(*) FROM {}{}", config.table, where_sql);
            let total: i64 = conn.query_row(
                &count_sql,
                rusqlite::params_from_iter(binds.iter()),
                |row| row.get(0),
            )?;

            let mut paged_binds = binds.clone();
            paged_binds.push(SqlValue::Integer(i64::from(per_page)));
            paged_binds.push(SqlValue::Integer(
                i64::from(page - 1) * i64::from(per_page),
            ));
            let paged_sql = format!("{} LIMIT ? OFFSET ?", select_sql);

            let mut records = fetch_records(&conn, &paged_sql, &paged_binds, &columns)?;
            self.decorate(&conn, &mut records, lang, is_admin)?;

            let last_page = ((total as u64).div_ceil(u64::from(per_page)) as u32).max(1);
            Ok(ListResult::Paginated(Page {
                current_page: page,
                data: records,
                per_page,
                total: total as u64,
                last_page,
            }))
        } else {
            let mut records = fetch_records(&conn, &select_sql, &binds, &columns)?;
            self.decorate(&conn, &mut records, lang, is_admin)?;
            Ok(ListResult::Complete(records))
        }
    }

    /// Complete (unpaginated) public listing with extra equality conditions;
    /// used by resource-specific views like the home-page events.
    pub fn list_where(
        &self,
        db: &Database,
        conditions: &[(&str, &str)],
        lang: Option<&str>,
    ) -> Result<Vec<Record>, ServiceError> {
        let config = &self.config;

        let mut where_sql = String::from(" WHERE 1=1");
        let mut binds: Vec<SqlValue> = Vec::new();
        for (column, value) in conditions {
            where_sql.push_str(&format!(" AND {} = ?", column));
            binds.push(SqlValue::Text(value.to_string()));
        }
        if let Some(condition) = self.hooks.non_admin_condition() {
            where_sql.push_str(&format!(" AND {} = ?", condition.column));
            binds.push(SqlValue::Text(condition.value.to_string()));
        }

        let columns = config.select_columns(false);
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} {}",
            columns.join(", "),
            config.table,
            where_sql,
            config.default_sort_by,
            config.default_sort_direction.as_sql()
        );

        let conn = db.lock();
        let mut records = fetch_records(&conn, &sql, &binds, &columns)?;
        self.decorate(&conn, &mut records, lang, false)?;
        Ok(records)
    }

    /// Fetch a single entity by key, `None` when absent (or filtered out for
    /// the public view).
    pub fn get_by_key(
        &self,
        db: &Database,
        key: &Key,
        lang: Option<&str>,
        is_admin: bool,
    ) -> Result<Option<Record>, ServiceError> {
        let config = &self.config;

        let mut where_sql = format!(" WHERE {} = ?", config.key.column());
        let mut binds = vec![key.to_sql_value()];
        if !is_admin {
            if let Some(condition) = self.hooks.non_admin_condition() {
                where_sql.push_str(&format!(" AND {} = ?", condition.column));
                binds.push(SqlValue::Text(condition.value.to_string()));
            }
        }

        let columns = config.select_columns(is_admin);
        let sql = format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            config.table,
            where_sql
        );

        let conn = db.lock();
        let mut records = fetch_records(&conn, &sql, &binds, &columns)?;
        if records.is_empty() {
            return Ok(None);
        }
        self.decorate(&conn, &mut records, lang, is_admin)?;
        Ok(records.pop())
    }

    /// Attach translation rows and apply field visibility.
    pub(crate) fn decorate(
        &self,
        conn: &Connection,
        records: &mut [Record],
        lang: Option<&str>,
        is_admin: bool,
    ) -> Result<(), ServiceError> {
        if let Some(spec) = &self.config.translations {
            for record in records.iter_mut() {
                attach_translations(conn, record, self.config.key.column(), spec, lang, is_admin)?;
            }
        }

        for record in records.iter_mut() {
            self.apply_visibility(record, is_admin);
        }
        Ok(())
    }

    fn apply_visibility(&self, record: &mut Record, is_admin: bool) {
        let restored: &[&str] = if is_admin {
            self.hooks.admin_visible()
        } else {
            &[]
        };
        for hidden in self.config.hidden {
            if !restored.contains(hidden) {
                record.remove(*hidden);
            }
        }

        // The key column is always selected for the translation lookup; drop
        // it again when the field lists never exposed it.
        let key_column = self.config.key.column();
        if !self.config.fields.contains(&key_column)
            && !self.config.admin_fields.contains(&key_column)
        {
            record.remove(key_column);
        }
    }
}

fn attach_translations(
    conn: &Connection,
    record: &mut Record,
    key_column: &str,
    spec: &TranslationSpec,
    lang: Option<&str>,
    is_admin: bool,
) -> Result<(), ServiceError> {
    let Some(parent) = record.get(key_column).map(json_to_sql) else {
        return Ok(());
    };

    let mut columns: Vec<&str> = vec!["lang_code"];
    columns.extend(spec.fields);

    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        columns.join(", "),
        spec.table,
        spec.parent_column
    );
    let mut binds = vec![parent];

    // Admins see every language; the public view narrows to the requested
    // one when the resource filters by language. LIKE keeps the lookup
    // case-insensitive, matching how codes are requested ("nl" vs "NL").
    if !is_admin && spec.public_filters_by_lang {
        if let Some(lang) = lang {
            sql.push_str(" AND lang_code LIKE ?");
            binds.push(SqlValue::Text(lang.to_string()));
        }
    }
    sql.push_str(" ORDER BY lang_code");

    let rows = fetch_records(conn, &sql, &binds, &columns)?;
    record.insert(
        spec.payload_key.to_string(),
        Value::Array(rows.into_iter().map(Value::Object).collect()),
    );
    Ok(())
}

/// Run a SELECT and map each row into a JSON record keyed by column name.
pub(crate) fn fetch_records(
    conn: &Connection,
    sql: &str,
    binds: &[SqlValue],
    columns: &[&str],
) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds.iter()), |row| {
        let mut record = Record::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.to_string(), sql_to_json(row.get_ref(index)?));
        }
        Ok(record)
    })?;
    rows.collect()
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

pub(crate) fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null)
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // Nested structures are not column values; store their JSON form.
        other => SqlValue::Text(other.to_string()),
    }
}
