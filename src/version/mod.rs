//! Version model for mirrored images
//!
//! Upstream tags are parsed into [`record::VersionRecord`]s, which define the
//! ordering every other component relies on, and expanded into the tag
//! aliases published on the destination by [`tags::TagSet`].
//!
//! # Modules
//!
//! - [`record`]: Tag parsing and version ordering
//! - [`tags`]: Full/minor/major and floating tag derivation

pub mod record;
pub mod tags;
