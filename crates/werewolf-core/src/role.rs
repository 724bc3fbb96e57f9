//! Roles, factions, and the fixed role pool.
//!
//! This module contains:
//! - The five role tags and their faction mapping
//! - The fixed 10-slot role pool used by every game
//! - Chinese display strings used in the narrative log

use serde::{Deserialize, Serialize};

/// Number of seats in a standard game
pub const SEAT_COUNT: usize = 10;

/// A player's role, assigned once at game start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Kills one player each night, wins by outnumbering the good faction
    Werewolf,
    /// No night ability
    Villager,
    /// Inspects one player's alignment each night
    Seer,
    /// Holds one save potion and one poison, each usable once per game
    Witch,
    /// On death, may immediately take one living player down
    Hunter,
}

impl Role {
    /// Which faction this role wins with
    pub fn faction(&self) -> Faction {
        match self {
            Role::Werewolf => Faction::Werewolves,
            _ => Faction::Villagers,
        }
    }

    /// Narrative display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Werewolf => "狼人",
            Role::Villager => "村民",
            Role::Seer => "预言家",
            Role::Witch => "女巫",
            Role::Hunter => "猎人",
        }
    }

    /// The verdict string the seer receives when inspecting this role
    pub fn inspect_verdict(&self) -> &'static str {
        match self.faction() {
            Faction::Werewolves => "是狼人",
            Faction::Villagers => "是好人",
        }
    }

    /// Whether this role belongs to the werewolf faction
    pub fn is_werewolf(&self) -> bool {
        matches!(self, Role::Werewolf)
    }
}

/// The two win factions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Werewolves,
    Villagers,
}

impl Faction {
    /// Narrative display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Faction::Werewolves => "狼人阵营",
            Faction::Villagers => "好人阵营",
        }
    }
}

/// The fixed role pool: 3 werewolves, 4 villagers, seer, witch, hunter
pub fn role_pool() -> Vec<Role> {
    let mut pool = Vec::with_capacity(SEAT_COUNT);

    // 3 Werewolves
    pool.extend(std::iter::repeat(Role::Werewolf).take(3));

    // 4 Villagers
    pool.extend(std::iter::repeat(Role::Villager).take(4));

    // One of each special role
    pool.push(Role::Seer);
    pool.push(Role::Witch);
    pool.push(Role::Hunter);

    pool
}
