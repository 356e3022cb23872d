//! Accumulated enemy state
//!
//! [`EnemyTable`] is a downstream consumer of [`TapEvent`]s: it merges the
//! partial updates for each entity into one snapshot and forgets everything
//! when the server changes.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{EnemyAttributeUpdate, TapEvent};

/// Latest known attributes of one enemy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnemySnapshot {
    pub id: u64,
    pub name: Option<String>,
    pub hp: Option<u64>,
    pub max_hp: Option<u64>,
}

impl EnemySnapshot {
    fn merge(&mut self, update: &EnemyAttributeUpdate) {
        if let Some(name) = &update.name {
            self.name = Some(name.clone());
        }
        if update.hp.is_some() {
            self.hp = update.hp;
        }
        if update.max_hp.is_some() {
            self.max_hp = update.max_hp;
        }
    }

    /// Current HP as a fraction of max HP.
    pub fn health_fraction(&self) -> Option<f64> {
        match (self.hp, self.max_hp) {
            (Some(hp), Some(max)) if max > 0 => Some(hp as f64 / max as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnemyTable {
    enemies: HashMap<u64, EnemySnapshot>,
}

impl EnemyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &TapEvent) {
        match event {
            TapEvent::EnemyUpdate(update) => {
                self.enemies
                    .entry(update.entity_id)
                    .or_insert_with(|| EnemySnapshot {
                        id: update.entity_id,
                        ..EnemySnapshot::default()
                    })
                    .merge(update);
            }
            TapEvent::ServerChanged(changed) => {
                let dropped = self.enemies.len();
                debug!("Server changed to {}; dropping {} enemies", changed.flow, dropped);
                self.enemies.clear();
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<&EnemySnapshot> {
        self.enemies.get(&id)
    }

    /// Snapshots ordered by entity id.
    pub fn snapshots(&self) -> Vec<EnemySnapshot> {
        let mut snapshots: Vec<EnemySnapshot> = self.enemies.values().cloned().collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}

impl<'a> Extend<&'a TapEvent> for EnemyTable {
    fn extend<I: IntoIterator<Item = &'a TapEvent>>(&mut self, events: I) {
        for event in events {
            self.apply(event);
        }
    }
}
