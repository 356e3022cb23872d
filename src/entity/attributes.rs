//! Attribute id table and per-attribute decoding
//!
//! Each known attribute id maps to one decode function in [`ATTRIBUTE_TABLE`].
//! Supporting a new attribute is a table entry, not a new branch. A decode
//! function turns the raw bytes into at most one [`EnemyAttributeUpdate`];
//! undecodable bytes are skipped without affecting sibling attributes.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::Result;
use crate::names::MonsterNames;
use crate::types::{AttributeValue, EnemyAttributeUpdate, TapEvent};
use crate::wire::cursor::read_varint;

/// Semantic meaning of a known attribute id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// UTF-8 display name.
    Name,
    /// Template id, resolved to a display name through the name table.
    MonsterTemplateId,
    /// Current hit points (varint).
    CurrentHp,
    /// Maximum hit points (varint).
    MaxHp,
}

impl AttributeKind {
    pub const fn id(self) -> u32 {
        match self {
            AttributeKind::Name => 0x01,
            AttributeKind::MonsterTemplateId => 0x0a,
            AttributeKind::CurrentHp => 0x2c2e,
            AttributeKind::MaxHp => 0x2c38,
        }
    }

    /// Look up the kind for a wire id.
    pub fn from_id(id: u32) -> Option<Self> {
        ATTRIBUTE_TABLE.iter().find(|entry| entry.kind.id() == id).map(|entry| entry.kind)
    }
}

type DecodeFn = fn(u64, &[u8], &dyn MonsterNames) -> Result<Option<EnemyAttributeUpdate>>;

/// One row of the attribute table.
pub struct AttributeEntry {
    pub kind: AttributeKind,
    decode: DecodeFn,
}

/// Known attributes and their decoders.
pub static ATTRIBUTE_TABLE: [AttributeEntry; 4] = [
    AttributeEntry { kind: AttributeKind::Name, decode: decode_name },
    AttributeEntry { kind: AttributeKind::MonsterTemplateId, decode: decode_template_id },
    AttributeEntry { kind: AttributeKind::CurrentHp, decode: decode_hp },
    AttributeEntry { kind: AttributeKind::MaxHp, decode: decode_max_hp },
];

fn decode_name(
    entity_id: u64,
    raw: &[u8],
    _names: &dyn MonsterNames,
) -> Result<Option<EnemyAttributeUpdate>> {
    let name = String::from_utf8_lossy(raw);
    Ok(Some(EnemyAttributeUpdate::name(entity_id, name)))
}

fn decode_template_id(
    entity_id: u64,
    raw: &[u8],
    names: &dyn MonsterNames,
) -> Result<Option<EnemyAttributeUpdate>> {
    let (template_id, _) = read_varint(raw)?;
    let key = template_id.to_string();
    match names.lookup(&key) {
        Some(name) => Ok(Some(EnemyAttributeUpdate::name(entity_id, name))),
        None => {
            debug!("No name for template {} (entity {})", template_id, entity_id);
            Ok(None)
        }
    }
}

fn decode_hp(
    entity_id: u64,
    raw: &[u8],
    _names: &dyn MonsterNames,
) -> Result<Option<EnemyAttributeUpdate>> {
    let (hp, _) = read_varint(raw)?;
    Ok(Some(EnemyAttributeUpdate::hp(entity_id, hp)))
}

fn decode_max_hp(
    entity_id: u64,
    raw: &[u8],
    _names: &dyn MonsterNames,
) -> Result<Option<EnemyAttributeUpdate>> {
    let (max_hp, _) = read_varint(raw)?;
    Ok(Some(EnemyAttributeUpdate::max_hp(entity_id, max_hp)))
}

/// Decodes attribute collections into enemy updates.
#[derive(Clone)]
pub struct AttributeDecoder {
    names: Arc<dyn MonsterNames>,
}

impl AttributeDecoder {
    pub fn new(names: Arc<dyn MonsterNames>) -> Self {
        Self { names }
    }

    /// Decode every attribute of one entity, appending one event per
    /// successfully decoded attribute.
    ///
    /// Returns the number of events appended.
    pub fn decode(
        &self,
        entity_id: u64,
        attributes: &[AttributeValue],
        out: &mut Vec<TapEvent>,
    ) -> usize {
        let before = out.len();
        for attribute in attributes {
            if attribute.id == 0 || attribute.raw.is_empty() {
                continue;
            }
            let entry = ATTRIBUTE_TABLE.iter().find(|entry| entry.kind.id() == attribute.id);
            let Some(entry) = entry else {
                continue;
            };

            match (entry.decode)(entity_id, &attribute.raw, self.names.as_ref()) {
                Ok(Some(update)) => {
                    trace!("Entity {} {:?}: {:?}", entity_id, entry.kind, update);
                    out.push(TapEvent::EnemyUpdate(update));
                }
                Ok(None) => {}
                Err(e) => debug!("Skipping {:?} for entity {}: {}", entry.kind, entity_id, e),
            }
        }
        out.len() - before
    }
}

impl std::fmt::Debug for AttributeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDecoder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{NameTable, NoNames};
    use crate::test_utils::encode_varint;

    fn decoder() -> AttributeDecoder {
        let names: NameTable = [("300", "Iron Golem")].into_iter().collect();
        AttributeDecoder::new(Arc::new(names))
    }

    fn updates(out: &[TapEvent]) -> Vec<EnemyAttributeUpdate> {
        out.iter().filter_map(|e| e.as_enemy_update().cloned()).collect()
    }

    #[test]
    fn table_ids_are_unique() {
        for (i, a) in ATTRIBUTE_TABLE.iter().enumerate() {
            for b in &ATTRIBUTE_TABLE[i + 1..] {
                assert_ne!(a.kind.id(), b.kind.id());
            }
        }
        assert_eq!(AttributeKind::from_id(0x2c38), Some(AttributeKind::MaxHp));
        assert_eq!(AttributeKind::from_id(0x2710), None);
    }

    #[test]
    fn current_hp_varint() {
        let mut out = Vec::new();
        let hp = AttributeValue::new(0x2c2e, encode_varint(5000));
        let n = decoder().decode(0x1000_0040, &[hp], &mut out);
        assert_eq!(n, 1);
        assert_eq!(updates(&out), vec![EnemyAttributeUpdate::hp(0x1000_0040, 5000)]);
    }

    #[test]
    fn each_attribute_emits_its_own_event() {
        let attrs = vec![
            AttributeValue::new(0x01, "Slime King".as_bytes().to_vec()),
            AttributeValue::new(0x2c2e, encode_varint(12)),
            AttributeValue::new(0x2c38, encode_varint(300)),
            AttributeValue::new(0x0a, encode_varint(300)),
        ];
        let mut out = Vec::new();
        decoder().decode(64, &attrs, &mut out);

        assert_eq!(
            updates(&out),
            vec![
                EnemyAttributeUpdate::name(64, "Slime King"),
                EnemyAttributeUpdate::hp(64, 12),
                EnemyAttributeUpdate::max_hp(64, 300),
                EnemyAttributeUpdate::name(64, "Iron Golem"),
            ]
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut out = Vec::new();
        decoder().decode(64, &[AttributeValue::new(0x01, vec![b'O', 0xff, b'k'])], &mut out);
        assert_eq!(updates(&out)[0].name.as_deref(), Some("O\u{fffd}k"));
    }

    #[test]
    fn unknown_template_emits_nothing() {
        let mut out = Vec::new();
        let decoder = AttributeDecoder::new(Arc::new(NoNames));
        let template = AttributeValue::new(0x0a, encode_varint(300));
        assert_eq!(decoder.decode(64, &[template], &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn bad_varint_skips_only_that_attribute() {
        let attrs = vec![
            AttributeValue::new(0x2c2e, vec![0xff, 0xff]),
            AttributeValue::new(0x2c38, encode_varint(900)),
        ];
        let mut out = Vec::new();
        decoder().decode(64, &attrs, &mut out);
        assert_eq!(updates(&out), vec![EnemyAttributeUpdate::max_hp(64, 900)]);
    }

    #[test]
    fn empty_and_zero_id_attributes_are_skipped() {
        let attrs = vec![
            AttributeValue::new(0x2c2e, Vec::new()),
            AttributeValue::new(0, encode_varint(5)),
            AttributeValue::new(0x2710, encode_varint(60)),
        ];
        let mut out = Vec::new();
        assert_eq!(decoder().decode(64, &attrs, &mut out), 0);
    }
}
