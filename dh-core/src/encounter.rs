//! The combatants taking part in a fight.

use crate::character::{Combatant, CombatantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory store of combatants. The engine reads from it while resolving
/// and only writes to it through [`apply_effects`](crate::rules::apply_effects).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: Uuid,
    pub name: String,
    pub combatants: HashMap<CombatantId, Combatant>,
}

impl Encounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            combatants: HashMap::new(),
        }
    }

    /// Add a combatant, returning its id.
    pub fn add(&mut self, combatant: Combatant) -> CombatantId {
        let id = combatant.id;
        self.combatants.insert(id, combatant);
        id
    }

    pub fn with_combatant(mut self, combatant: Combatant) -> Self {
        self.add(combatant);
        self
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn remove(&mut self, id: CombatantId) -> Option<Combatant> {
        self.combatants.remove(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Combatant> {
        let name = name.to_lowercase();
        self.combatants
            .values()
            .find(|c| c.name.to_lowercase() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }
}
