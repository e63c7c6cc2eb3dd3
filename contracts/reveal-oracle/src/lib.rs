//! Stellarcade Reveal Oracle Contract
//!
//! Holds the verified plaintext numbers behind each round's sealed guesses.
//! Game contracts only ever see opaque commitments; once a round's window
//! has closed, the designated oracle decrypts and checks the submissions
//! off-chain and publishes the resulting numbers here:
//!
//! 1. The oracle calls `publish_reveal(game_id, round_id, numbers)`.
//!    `numbers` is aligned to the game's roster order; seats that did not
//!    submit carry a placeholder the game contract ignores.
//! 2. The game contract calls `get_revealed_numbers(game_id, round_id)`
//!    while processing the round and fails closed if nothing is published.
//!
//! ## Replay Safety
//! Each `(game_id, round_id)` can be published exactly once, so the numbers
//! a round was resolved with can never be swapped afterwards.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Oracle. Fixed contract-level config.
//! - `persistent()`: one `Reveal` entry per round, TTL bumped on write.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Highest guess a player may reveal.
pub const MAX_NUMBER: u32 = 100;

/// A reveal always covers a full roster, one entry per seat.
pub const ROSTER_SIZE: u32 = 5;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized     = 2,
    NotAuthorized      = 3,
    /// List does not hold exactly `ROSTER_SIZE` entries.
    InvalidLength      = 4,
    /// An entry is above `MAX_NUMBER`.
    InvalidNumber      = 5,
    AlreadyRevealed    = 6,
    RevealNotFound     = 7,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Oracle,
    // --- persistent() ---
    /// Published numbers for `(game_id, round_id)`.
    Reveal(u64, u32),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevealEntry {
    pub numbers: Vec<u32>,
    pub published_at: u64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct RevealPublished {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub round_id: u32,
    pub numbers: Vec<u32>,
}

#[contractevent]
pub struct OracleRotated {
    pub oracle: Address,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct RevealOracle;

#[contractimpl]
impl RevealOracle {
    /// Initialize the contract. May only be called once.
    ///
    /// `oracle` is the sole address permitted to publish reveals.
    pub fn init(env: Env, admin: Address, oracle: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Oracle, &oracle);

        Ok(())
    }

    /// Replace the publishing oracle. Admin only.
    pub fn set_oracle(env: Env, admin: Address, oracle: Address) -> Result<(), Error> {
        require_initialized(&env)?;
        require_admin(&env, &admin)?;

        env.storage().instance().set(&DataKey::Oracle, &oracle);
        OracleRotated { oracle }.publish(&env);

        Ok(())
    }

    /// Publish the verified numbers of one round. Oracle only, once per round.
    pub fn publish_reveal(
        env: Env,
        oracle: Address,
        game_id: u64,
        round_id: u32,
        numbers: Vec<u32>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_oracle(&env, &oracle)?;

        if numbers.len() != ROSTER_SIZE {
            return Err(Error::InvalidLength);
        }
        if numbers.iter().any(|n| n > MAX_NUMBER) {
            return Err(Error::InvalidNumber);
        }

        let key = DataKey::Reveal(game_id, round_id);
        if env.storage().persistent().has(&key) {
            return Err(Error::AlreadyRevealed);
        }

        let entry = RevealEntry {
            numbers: numbers.clone(),
            published_at: env.ledger().timestamp(),
        };
        env.storage().persistent().set(&key, &entry);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);

        RevealPublished {
            game_id,
            round_id,
            numbers,
        }
        .publish(&env);

        Ok(())
    }

    /// Numbers for `(game_id, round_id)` in roster order.
    ///
    /// Returns `RevealNotFound` until the oracle has published the round.
    pub fn get_revealed_numbers(env: Env, game_id: u64, round_id: u32) -> Result<Vec<u32>, Error> {
        require_initialized(&env)?;

        let entry: RevealEntry = env
            .storage()
            .persistent()
            .get(&DataKey::Reveal(game_id, round_id))
            .ok_or(Error::RevealNotFound)?;

        Ok(entry.numbers)
    }

    pub fn get_reveal(env: Env, game_id: u64, round_id: u32) -> Result<RevealEntry, Error> {
        require_initialized(&env)?;

        env.storage()
            .persistent()
            .get(&DataKey::Reveal(game_id, round_id))
            .ok_or(Error::RevealNotFound)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn require_oracle(env: &Env, caller: &Address) -> Result<(), Error> {
    let oracle: Address = env
        .storage()
        .instance()
        .get(&DataKey::Oracle)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &oracle {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
