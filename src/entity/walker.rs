//! Routing of monster entities to the attribute decoder

use tracing::trace;

use super::attributes::AttributeDecoder;
use crate::types::{EntityRecord, TapEvent};

/// Low 16 bits of a monster's entity id.
pub const MONSTER_TYPE_TAG: u64 = 64;

/// Monster ids carry the type tag in their low 16 bits.
pub fn is_monster(entity_id: u64) -> bool {
    (entity_id & 0xffff) == MONSTER_TYPE_TAG
}

/// Filters entity records and forwards monster attributes.
#[derive(Debug, Clone)]
pub struct EntityWalker {
    attributes: AttributeDecoder,
}

impl EntityWalker {
    pub fn new(attributes: AttributeDecoder) -> Self {
        Self { attributes }
    }

    /// Walk decoded records, appending events for monster attributes.
    pub fn walk(&self, records: &[EntityRecord], out: &mut Vec<TapEvent>) -> usize {
        let mut emitted = 0;
        for record in records {
            if !is_monster(record.id) {
                continue;
            }
            trace!("Monster {} with {} attributes", record.id, record.attributes.len());
            emitted += self.attributes.decode(record.id, &record.attributes, out);
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NoNames;
    use crate::test_utils::encode_varint;
    use crate::types::{AttributeValue, EnemyAttributeUpdate};
    use std::sync::Arc;

    fn walker() -> EntityWalker {
        EntityWalker::new(AttributeDecoder::new(Arc::new(NoNames)))
    }

    #[test]
    fn monster_tag_uses_low_sixteen_bits() {
        assert!(is_monster(0x1000_0040));
        assert!(is_monster(64));
        assert!(!is_monster(0x1000_0041));
        assert!(!is_monster(0x0040_0000));
    }

    #[test]
    fn only_monsters_are_forwarded() {
        let hp = vec![AttributeValue::new(0x2c2e, encode_varint(5000))];
        let records = vec![
            EntityRecord::new(0x1000_0040, hp.clone()),
            EntityRecord::new(0x1000_0041, hp),
        ];
        let mut out = Vec::new();

        assert_eq!(walker().walk(&records, &mut out), 1);
        assert_eq!(out, vec![TapEvent::EnemyUpdate(EnemyAttributeUpdate::hp(0x1000_0040, 5000))]);
    }
}
