//! Mutation pipeline: validate, persist the optional image, then write the
//! entity and its translation rows inside one transaction.

use crate::db::Database;
use crate::error::{ErrorBag, ServiceError};
use crate::service::image::{ImageStore, UploadedImage};
use crate::service::query::json_to_sql;
use crate::service::resource::{Key, KeyKind, Record, Resource, TranslationSpec};
use crate::service::validate::validate;
use rusqlite::types::Value as SqlValue;
use rusqlite::Transaction;
use serde_json::Value;

impl Resource {
    /// Create an entity. Returns the freshly persisted admin view.
    pub fn add(
        &self,
        db: &Database,
        images: &ImageStore,
        mut data: Record,
        image: Option<UploadedImage>,
    ) -> Result<Record, ServiceError> {
        let errors = validate(self.config.rules, &data, image.as_ref());
        if errors.has_errors() {
            return Err(ServiceError::Validation(errors));
        }

        self.handle_image(db, images, &mut data, image)?;
        let translations = extract_translations(&mut data, self.config.translations.as_ref())?;

        let now = chrono::Utc::now().to_rfc3339();
        let key;
        {
            let mut conn = db.lock();
            let tx = conn.transaction()?;

            let mut columns: Vec<&str> = Vec::new();
            let mut binds: Vec<SqlValue> = Vec::new();
            for column in self.config.writable_columns() {
                if let Some(value) = data.get(column) {
                    columns.push(column);
                    binds.push(json_to_sql(value));
                }
            }
            columns.push("created_at");
            binds.push(SqlValue::Text(now.clone()));
            columns.push("updated_at");
            binds.push(SqlValue::Text(now.clone()));

            let placeholders = vec!["?"; binds.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.config.table,
                columns.join(", "),
                placeholders
            );
            tx.execute(&sql, rusqlite::params_from_iter(binds.iter()))
                .map_err(|err| self.map_insert_error(err))?;

            key = match self.config.key {
                KeyKind::AutoId => Key::Id(tx.last_insert_rowid()),
                KeyKind::Natural(column) => Key::Code(
                    data.get(column)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                ),
            };

            if let Some(spec) = &self.config.translations {
                upsert_translations(&tx, spec, &key, &translations, &now)?;
            }
            tx.commit()?;
        }

        self.get_by_key(db, &key, None, true)?
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    /// Update an entity's scalar fields and upsert its translations.
    /// A missing key rolls the whole transaction back.
    pub fn update(
        &self,
        db: &Database,
        images: &ImageStore,
        key: &Key,
        mut data: Record,
        image: Option<UploadedImage>,
    ) -> Result<Record, ServiceError> {
        let errors = validate(self.config.rules, &data, image.as_ref());
        if errors.has_errors() {
            return Err(ServiceError::Validation(errors));
        }

        self.handle_image(db, images, &mut data, image)?;
        let translations = extract_translations(&mut data, self.config.translations.as_ref())?;

        // A natural key may itself be rewritten by the payload; translations
        // and the fresh fetch must use the post-update key.
        let final_key = match self.config.key {
            KeyKind::Natural(column) => data
                .get(column)
                .and_then(|v| v.as_str())
                .map(|code| Key::Code(code.to_string()))
                .unwrap_or_else(|| key.clone()),
            KeyKind::AutoId => key.clone(),
        };

        let now = chrono::Utc::now().to_rfc3339();
        {
            let mut conn = db.lock();
            let tx = conn.transaction()?;

            let key_column = self.config.key.column();
            let exists: i64 = tx.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?",
                    self.config.table, key_column
                ),
                rusqlite::params![key.to_sql_value()],
                |row| row.get(0),
            )?;
            if exists == 0 {
                // Dropping the transaction rolls back; nothing was written.
                return Err(ServiceError::NotFound(key.to_string()));
            }

            let mut assignments: Vec<String> = Vec::new();
            let mut binds: Vec<SqlValue> = Vec::new();
            for column in self.config.writable_columns() {
                if let Some(value) = data.get(column) {
                    assignments.push(format!("{} = ?", column));
                    binds.push(json_to_sql(value));
                }
            }
            assignments.push("updated_at = ?".to_string());
            binds.push(SqlValue::Text(now.clone()));
            binds.push(key.to_sql_value());

            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.config.table,
                assignments.join(", "),
                key_column
            );
            tx.execute(&sql, rusqlite::params_from_iter(binds.iter()))
                .map_err(|err| self.map_insert_error(err))?;

            if let Some(spec) = &self.config.translations {
                upsert_translations(&tx, spec, &final_key, &translations, &now)?;
            }
            tx.commit()?;
        }

        self.get_by_key(db, &final_key, None, true)?
            .ok_or_else(|| ServiceError::NotFound(final_key.to_string()))
    }

    /// Delete an entity; translation rows cascade via the foreign keys.
    pub fn delete(&self, db: &Database, key: &Key) -> Result<bool, ServiceError> {
        if let Some(bag) = self.hooks.guard_delete(key) {
            return Err(ServiceError::Validation(bag));
        }

        let conn = db.lock();
        let key_column = self.config.key.column();

        let exists: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                self.config.table, key_column
            ),
            rusqlite::params![key.to_sql_value()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(ServiceError::NotFound(key.to_string()));
        }

        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", self.config.table, key_column),
            rusqlite::params![key.to_sql_value()],
        )?;
        if deleted == 0 {
            return Err(ServiceError::DeleteFailed(key.to_string()));
        }
        Ok(true)
    }

    /// Store an uploaded image and let the hook write its URL into the data.
    fn handle_image(
        &self,
        db: &Database,
        images: &ImageStore,
        data: &mut Record,
        image: Option<UploadedImage>,
    ) -> Result<(), ServiceError> {
        let Some(image) = image else {
            return Ok(());
        };
        let Some(location) = self.config.image_location else {
            return Ok(());
        };

        let name = self.hooks.image_name(data, image.extension());
        let url = images.save(location, &name, &image.bytes)?;
        let languages = db.language_codes()?;
        self.hooks.save_image_url(data, &url, &languages);
        Ok(())
    }

    /// A constraint violation on a natural-key insert means the key is
    /// taken; everything else stays a database fault.
    fn map_insert_error(&self, err: rusqlite::Error) -> ServiceError {
        if let KeyKind::Natural(column) = self.config.key {
            if let rusqlite::Error::SqliteFailure(code, _) = &err {
                if code.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ServiceError::Validation(ErrorBag::of(
                        column,
                        format!("The {} has already been taken.", column),
                    ));
                }
            }
        }
        ServiceError::Db(err)
    }
}

/// Pull the translations payload out of the data map and normalize it to a
/// list of rows. One wire format is accepted: an array of objects each with
/// a string `lang_code`, optionally JSON-encoded as a string (multipart
/// forms); anything else is a validation error.
pub(crate) fn extract_translations(
    data: &mut Record,
    spec: Option<&TranslationSpec>,
) -> Result<Vec<Record>, ServiceError> {
    let Some(spec) = spec else {
        return Ok(Vec::new());
    };
    let Some(raw) = data.remove(spec.payload_key) else {
        return Ok(Vec::new());
    };

    let malformed = || {
        ServiceError::Validation(ErrorBag::of(
            spec.payload_key,
            format!(
                "The {} must be an array of objects, each with a lang_code.",
                spec.payload_key
            ),
        ))
    };

    let value = match raw {
        Value::String(text) => {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_json::from_str::<Value>(&text).map_err(|_| malformed())?
        }
        Value::Null => return Ok(Vec::new()),
        other => other,
    };

    let Value::Array(items) = value else {
        return Err(malformed());
    };

    let mut translations = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(row) = item else {
            return Err(malformed());
        };
        let lang_code = match row.get("lang_code") {
            Some(Value::String(code)) if !code.is_empty() => code.clone(),
            _ => return Err(malformed()),
        };

        let mut kept = Record::new();
        kept.insert("lang_code".to_string(), Value::String(lang_code));
        for field in spec.fields {
            if let Some(value) = row.get(*field) {
                kept.insert(field.to_string(), value.clone());
            }
        }
        translations.push(kept);
    }
    Ok(translations)
}

/// Update-or-insert one translation row per language code. Languages absent
/// from the payload are left untouched.
fn upsert_translations(
    tx: &Transaction<'_>,
    spec: &TranslationSpec,
    key: &Key,
    translations: &[Record],
    now: &str,
) -> Result<(), ServiceError> {
    for translation in translations {
        let lang_code = translation
            .get("lang_code")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let set_fields: Vec<&str> = spec
            .fields
            .iter()
            .copied()
            .filter(|field| translation.contains_key(*field))
            .collect();

        let mut assignments: Vec<String> =
            set_fields.iter().map(|f| format!("{} = ?", f)).collect();
        assignments.push("updated_at = ?".to_string());

        let update_sql = format!(
            "UPDATE {} SET {} WHERE {} = ? AND lang_code = ?",
            spec.table,
            assignments.join(", "),
            spec.parent_column
        );
        let mut binds: Vec<SqlValue> = set_fields
            .iter()
            .map(|f| json_to_sql(&translation[*f]))
            .collect();
        binds.push(SqlValue::Text(now.to_string()));
        binds.push(key.to_sql_value());
        binds.push(SqlValue::Text(lang_code.to_string()));

        let updated = tx.execute(&update_sql, rusqlite::params_from_iter(binds.iter()))?;
        if updated > 0 {
            continue;
        }

        let mut columns: Vec<&str> = vec![spec.parent_column, "lang_code"];
        columns.extend(&set_fields);
        columns.push("created_at");
        columns.push("updated_at");

        let mut binds: Vec<SqlValue> = vec![
            key.to_sql_value(),
            SqlValue::Text(lang_code.to_string()),
        ];
        binds.extend(set_fields.iter().map(|f| json_to_sql(&translation[*f])));
        binds.push(SqlValue::Text(now.to_string()));
        binds.push(SqlValue::Text(now.to_string()));

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            spec.table,
            columns.join(", "),
            vec!["?"; binds.len()].join(", ")
        );
        tx.execute(&insert_sql, rusqlite::params_from_iter(binds.iter()))
            .map_err(|err| {
                // With the row known absent, a constraint failure here means
                // the language code does not exist.
                let unknown_language = matches!(
                    &err,
                    rusqlite::Error::SqliteFailure(code, _)
                        if code.code == rusqlite::ErrorCode::ConstraintViolation
                );
                if unknown_language {
                    ServiceError::Validation(ErrorBag::of(
                        spec.payload_key,
                        format!("Unknown language code: {}", lang_code),
                    ))
                } else {
                    ServiceError::Db(err)
                }
            })?;
    }
    Ok(())
}
