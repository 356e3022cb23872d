//! Entity filtering and attribute decoding.
//!
//! Decoded sync messages are flattened into [`EntityRecord`](crate::types::EntityRecord)s.
//! [`EntityWalker`] keeps only monsters and hands their attributes to
//! [`AttributeDecoder`], which emits one partial update per attribute.

pub mod attributes;
pub mod walker;

pub use attributes::{ATTRIBUTE_TABLE, AttributeDecoder, AttributeKind};
pub use walker::{EntityWalker, MONSTER_TYPE_TAG, is_monster};
