//! Keyed stores and config accessors.
//!
//! - `instance()`: Admin, Config, LastGameId, OpenCursor.
//! - `persistent()`: Operator, Game, Roster, Player and Sessions entries,
//!   each its own ledger entry with TTL bumped on every write. Nothing is
//!   ever removed; finished games stay readable.

use soroban_sdk::{contracttype, Address, Env, IntoVal, Val, Vec};

use crate::{Error, GameConfig, GameData, PlayerData};

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Config,
    /// Id of the most recently created game; 0 before `init`.
    LastGameId,
    /// No game below this id is open for enrollment.
    OpenCursor,
    // --- persistent() ---
    /// Presence flag for addresses allowed to drive games and rounds.
    Operator(Address),
    Game(u64),
    /// `Vec<Address>` in join order.
    Roster(u64),
    Player(u64, Address),
    /// Session slots of one address.
    Sessions(Address),
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Admin)
}

pub fn get_admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

pub fn get_config(env: &Env) -> Result<GameConfig, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn set_config(env: &Env, config: &GameConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn last_game_id(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::LastGameId)
        .unwrap_or(0)
}

pub fn set_last_game_id(env: &Env, game_id: u64) {
    env.storage().instance().set(&DataKey::LastGameId, &game_id);
}

pub fn open_cursor(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::OpenCursor)
        .unwrap_or(1)
}

pub fn set_open_cursor(env: &Env, game_id: u64) {
    env.storage().instance().set(&DataKey::OpenCursor, &game_id);
}

pub fn is_operator(env: &Env, address: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Operator(address.clone()))
}

pub fn set_operator(env: &Env, address: &Address, enabled: bool) {
    let key = DataKey::Operator(address.clone());
    if enabled {
        set_persistent(env, key, &());
    } else {
        env.storage().persistent().remove(&key);
    }
}

pub fn try_get_game(env: &Env, game_id: u64) -> Option<GameData> {
    env.storage().persistent().get(&DataKey::Game(game_id))
}

pub fn get_game(env: &Env, game_id: u64) -> Result<GameData, Error> {
    if game_id == 0 {
        return Err(Error::InvalidGameId);
    }
    try_get_game(env, game_id).ok_or(Error::GameNotFound)
}

pub fn set_game(env: &Env, game: &GameData) {
    set_persistent(env, DataKey::Game(game.game_id), game);
}

pub fn get_roster(env: &Env, game_id: u64) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::Roster(game_id))
        .unwrap_or(Vec::new(env))
}

pub fn set_roster(env: &Env, game_id: u64, roster: &Vec<Address>) {
    set_persistent(env, DataKey::Roster(game_id), roster);
}

pub fn has_player(env: &Env, game_id: u64, player: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Player(game_id, player.clone()))
}

pub fn get_player(env: &Env, game_id: u64, player: &Address) -> Result<PlayerData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Player(game_id, player.clone()))
        .ok_or(Error::NotEnrolled)
}

pub fn set_player(env: &Env, game_id: u64, player: &Address, data: &PlayerData) {
    set_persistent(env, DataKey::Player(game_id, player.clone()), data);
}

pub fn set_persistent<T>(env: &Env, key: DataKey, value: &T)
where
    T: IntoVal<Env, Val>,
{
    env.storage().persistent().set(&key, value);
    extend_persistent_ttl(env, &key);
}

fn extend_persistent_ttl(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}
