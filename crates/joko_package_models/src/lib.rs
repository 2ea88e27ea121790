//! Data model of pathing packs: attributes, categories, markers, trails and the pack itself.

pub mod attributes;
pub mod category;
pub mod marker;
pub mod package;
pub mod trail;
