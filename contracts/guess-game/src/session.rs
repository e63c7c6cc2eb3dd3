//! Session tracker: caps how many games one address occupies at once.
//!
//! Each address owns `MAX_ACTIVE_GAMES` fixed slots holding game ids, with
//! `EMPTY_SLOT` marking a free one. The slot vector is created at full
//! length and never grows; reserve and release are linear scans over it.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::storage::{self, DataKey};
use crate::Error;

pub const MAX_ACTIVE_GAMES: u32 = 5;

/// Game ids start at 1, so 0 never names a real game.
const EMPTY_SLOT: u64 = 0;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionSlots {
    pub slots: Vec<u64>,
    pub count: u32,
}

impl SessionSlots {
    fn empty(env: &Env) -> Self {
        let mut slots = Vec::new(env);
        for _ in 0..MAX_ACTIVE_GAMES {
            slots.push_back(EMPTY_SLOT);
        }
        SessionSlots { slots, count: 0 }
    }

    fn position(&self, game_id: u64) -> Option<u32> {
        (0..self.slots.len()).find(|&i| self.slots.get_unchecked(i) == game_id)
    }
}

fn load(env: &Env, player: &Address) -> SessionSlots {
    env.storage()
        .persistent()
        .get(&DataKey::Sessions(player.clone()))
        .unwrap_or_else(|| SessionSlots::empty(env))
}

/// Fails with `CapacityExceeded` if every slot is taken.
pub fn ensure_capacity(env: &Env, player: &Address) -> Result<(), Error> {
    if load(env, player).count >= MAX_ACTIVE_GAMES {
        return Err(Error::CapacityExceeded);
    }
    Ok(())
}

/// Put `game_id` into the first free slot.
pub fn reserve_slot(env: &Env, player: &Address, game_id: u64) -> Result<(), Error> {
    let mut sessions = load(env, player);
    if sessions.count >= MAX_ACTIVE_GAMES {
        return Err(Error::CapacityExceeded);
    }

    let free = sessions
        .position(EMPTY_SLOT)
        .ok_or(Error::CapacityExceeded)?;
    sessions.slots.set(free, game_id);
    sessions.count = sessions.count.checked_add(1).ok_or(Error::Overflow)?;

    storage::set_persistent(env, DataKey::Sessions(player.clone()), &sessions);
    Ok(())
}

/// Clear the slot holding `game_id`. No-op if the address does not hold it.
pub fn release_slot(env: &Env, player: &Address, game_id: u64) {
    let mut sessions = load(env, player);
    let Some(idx) = sessions.position(game_id) else {
        return;
    };

    sessions.slots.set(idx, EMPTY_SLOT);
    sessions.count = sessions.count.saturating_sub(1);
    storage::set_persistent(env, DataKey::Sessions(player.clone()), &sessions);
}

/// Game ids currently held by `player`, in slot order.
pub fn active_games(env: &Env, player: &Address) -> Vec<u64> {
    let mut out = Vec::new(env);
    for game_id in load(env, player).slots.iter() {
        if game_id != EMPTY_SLOT {
            out.push_back(game_id);
        }
    }
    out
}
