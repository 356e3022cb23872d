//! Events published to downstream consumers

use serde::{Deserialize, Serialize};

use super::FlowKey;

/// Partial update of one enemy's attributes.
///
/// Exactly one field is set per decoded attribute; consumers merge updates
/// for the same `entity_id` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnemyAttributeUpdate {
    pub entity_id: u64,
    pub name: Option<String>,
    pub hp: Option<u64>,
    pub max_hp: Option<u64>,
}

impl EnemyAttributeUpdate {
    pub fn name(entity_id: u64, name: impl Into<String>) -> Self {
        Self { entity_id, name: Some(name.into()), ..Self::default() }
    }

    pub fn hp(entity_id: u64, hp: u64) -> Self {
        Self { entity_id, hp: Some(hp), ..Self::default() }
    }

    pub fn max_hp(entity_id: u64, max_hp: u64) -> Self {
        Self { entity_id, max_hp: Some(max_hp), ..Self::default() }
    }
}

/// A new flow was recognized as the game server; prior entity state is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerChanged {
    pub flow: FlowKey,
}

/// Everything the analyzer emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapEvent {
    EnemyUpdate(EnemyAttributeUpdate),
    ServerChanged(ServerChanged),
}

impl TapEvent {
    /// The enemy update carried by this event, if any.
    pub fn as_enemy_update(&self) -> Option<&EnemyAttributeUpdate> {
        match self {
            TapEvent::EnemyUpdate(update) => Some(update),
            TapEvent::ServerChanged(_) => None,
        }
    }
}

impl From<EnemyAttributeUpdate> for TapEvent {
    fn from(update: EnemyAttributeUpdate) -> Self {
        TapEvent::EnemyUpdate(update)
    }
}
