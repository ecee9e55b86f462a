//! Behavioral hooks a resource can override.
//!
//! The query and mutation pipelines are generic; the few places where
//! resources genuinely differ in behavior (public visibility condition,
//! admin field restoration, image naming, image URL placement, delete
//! guards) are expressed through this trait instead of inheritance.

use crate::error::ErrorBag;
use crate::service::resource::{Key, Record};
use uuid::Uuid;

/// An extra equality condition appended to a query's WHERE clause.
/// Column names come from static configuration, values are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub column: &'static str,
    pub value: &'static str,
}

pub trait ResourceHooks: Send + Sync {
    /// Condition applied to non-admin queries. `None` means the resource is
    /// always public (languages, socials, static content).
    fn non_admin_condition(&self) -> Option<Condition> {
        None
    }

    /// Hidden fields restored in admin output.
    fn admin_visible(&self) -> &'static [&'static str] {
        &[]
    }

    /// File name for an uploaded image. The default is a random unique name;
    /// resources with deterministic naming (language flags, the single
    /// static-content image) override this.
    fn image_name(&self, _data: &Record, extension: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), extension)
    }

    /// Write the stored image's URL into the record before persisting.
    /// `languages` carries the known language codes for hooks that fan the
    /// URL out per language.
    fn save_image_url(&self, data: &mut Record, url: &str, _languages: &[String]) {
        data.insert(
            "image_url".to_string(),
            serde_json::Value::String(url.to_string()),
        );
    }

    /// Veto a delete before it runs. Returning a bag rejects the delete.
    fn guard_delete(&self, _key: &Key) -> Option<ErrorBag> {
        None
    }
}

/// Hooks for resources that override nothing.
pub struct DefaultHooks;

impl ResourceHooks for DefaultHooks {}

/// Hooks for publishable content (events, geocaches, messages): the public
/// only sees `state = 'ONLINE'` rows, and admins get `id` back.
pub struct PublishableHooks;

impl ResourceHooks for PublishableHooks {
    fn non_admin_condition(&self) -> Option<Condition> {
        Some(Condition {
            column: "state",
            value: "ONLINE",
        })
    }

    fn admin_visible(&self) -> &'static [&'static str] {
        &["id"]
    }
}
