//! Decoded entity records handed to the attribute layer

/// One raw attribute: a numeric id and bytes whose meaning depends on the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub id: u32,
    pub raw: Vec<u8>,
}

impl AttributeValue {
    pub fn new(id: u32, raw: impl Into<Vec<u8>>) -> Self {
        Self { id, raw: raw.into() }
    }
}

/// An entity (appearance or delta) with its attribute collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityRecord {
    pub id: u64,
    pub attributes: Vec<AttributeValue>,
}

impl EntityRecord {
    pub fn new(id: u64, attributes: Vec<AttributeValue>) -> Self {
        Self { id, attributes }
    }
}
