//! Generic translatable-resource service.
//!
//! One query pipeline and one mutation pipeline, parameterized by a static
//! [`ResourceConfig`] and a [`ResourceHooks`] implementation per resource.
//! The concrete resources live in [`crate::resources`].

pub mod hooks;
pub mod image;
pub mod mutation;
pub mod query;
pub mod resource;
pub mod validate;

pub use hooks::{Condition, DefaultHooks, PublishableHooks, ResourceHooks};
pub use image::{ImageStore, UploadedImage};
pub use query::{ListParams, ListResult, Page};
pub use resource::{
    Key, KeyKind, Record, Resource, ResourceConfig, SearchOn, SortDirection, TranslationSpec,
};
pub use validate::Rule;
