//! Concrete resource definitions.
//!
//! Each module is one total specialization of the generic service:
//! a static configuration plus (where needed) a hooks implementation.

pub mod contact;
pub mod event;
pub mod geocache;
pub mod language;
pub mod message;
pub mod social;
pub mod static_content;

use crate::config::Config;
use crate::service::Resource;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the resource registry, keyed by URL segment.
pub fn registry(config: &Config) -> HashMap<&'static str, Arc<Resource>> {
    [
        event::resource(),
        geocache::resource(),
        message::resource(),
        language::resource(&config.default_language),
        static_content::resource(),
        social::resource(),
        contact::resource(),
    ]
    .into_iter()
    .map(|resource| (resource.name(), Arc::new(resource)))
    .collect()
}
