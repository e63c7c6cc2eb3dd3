//! Stellarcade Treasury Contract
//!
//! Fee sink for settled games. Game contracts move each fee share to the
//! treasury's token balance and then record it here under a purpose tag
//! (`gamefee`, `liqfee`, ...). The admin releases accumulated fees to
//! downstream recipients.
//!
//! ## Invariant
//! The sum of all purpose buckets never exceeds the token balance held by
//! the contract; `receive_fee` refuses to book a fee that is not backed.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Env, Symbol,
};

pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    InvalidAmount = 4,
    InsufficientFunds = 5,
    UnbackedFee = 6,
    TransferFailed = 7,
    Overflow = 8,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    Token,
    TotalReceived,
    TotalReleased,
    /// Unreleased fees of one purpose.
    Bucket(Symbol),
    /// Lifetime fees of one purpose.
    Received(Symbol),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreasuryState {
    pub admin: Address,
    pub token_address: Address,
    pub available_balance: i128,
    pub total_received: i128,
    pub total_released: i128,
}

#[contractevent]
pub struct Initialized {
    pub admin: Address,
    pub token_address: Address,
}

#[contractevent]
pub struct FeeReceived {
    #[topic]
    pub from: Address,
    #[topic]
    pub purpose: Symbol,
    pub amount: i128,
}

#[contractevent]
pub struct Released {
    #[topic]
    pub to: Address,
    pub amount: i128,
    pub purpose: Symbol,
}

#[contract]
pub struct Treasury;

#[contractimpl]
impl Treasury {
    pub fn init(env: Env, admin: Address, token_address: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        let store = env.storage().instance();
        store.set(&DataKey::Admin, &admin);
        store.set(&DataKey::Token, &token_address);

        Initialized {
            admin,
            token_address,
        }
        .publish(&env);

        Ok(())
    }

    /// Book a fee share that `from` has already transferred to this contract.
    ///
    /// The share is credited to the `purpose` bucket and may later be
    /// released from that bucket only.
    pub fn receive_fee(env: Env, from: Address, purpose: Symbol, amount: i128) -> Result<(), Error> {
        let ledger = Ledger::load(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        from.require_auth();

        let booked = ledger.booked_total(&env)?.checked_add(amount).ok_or(Error::Overflow)?;
        if ledger.held(&env) < booked {
            return Err(Error::UnbackedFee);
        }

        bump(&env, DataKey::Bucket(purpose.clone()), amount)?;
        bump(&env, DataKey::Received(purpose.clone()), amount)?;
        bump(&env, DataKey::TotalReceived, amount)?;

        FeeReceived {
            from,
            purpose,
            amount,
        }
        .publish(&env);

        Ok(())
    }

    /// Pay `amount` out of the `purpose` bucket. Admin only.
    pub fn release(
        env: Env,
        admin: Address,
        to: Address,
        amount: i128,
        purpose: Symbol,
    ) -> Result<(), Error> {
        let ledger = Ledger::load(&env)?;
        admin.require_auth();
        if admin != ledger.admin {
            return Err(Error::NotAuthorized);
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let bucket = read_i128(&env, &DataKey::Bucket(purpose.clone()));
        if bucket < amount {
            return Err(Error::InsufficientFunds);
        }
        bump(&env, DataKey::Bucket(purpose.clone()), -amount)?;
        bump(&env, DataKey::TotalReleased, amount)?;

        let this = env.current_contract_address();
        match TokenClient::new(&env, &ledger.token).try_transfer(&this, &to, &amount) {
            Ok(Ok(())) => {}
            _ => return Err(Error::TransferFailed),
        }

        Released {
            to,
            amount,
            purpose,
        }
        .publish(&env);

        Ok(())
    }

    /// Total ever booked under `purpose`, released or not.
    pub fn fees_received(env: Env, purpose: Symbol) -> Result<i128, Error> {
        Ledger::load(&env)?;
        Ok(read_i128(&env, &DataKey::Received(purpose)))
    }

    /// Booked and not yet released under `purpose`.
    pub fn available(env: Env, purpose: Symbol) -> Result<i128, Error> {
        Ledger::load(&env)?;
        Ok(read_i128(&env, &DataKey::Bucket(purpose)))
    }

    pub fn treasury_state(env: Env) -> Result<TreasuryState, Error> {
        let ledger = Ledger::load(&env)?;

        Ok(TreasuryState {
            available_balance: ledger.booked_total(&env)?,
            total_received: read_i128(&env, &DataKey::TotalReceived),
            total_released: read_i128(&env, &DataKey::TotalReleased),
            admin: ledger.admin,
            token_address: ledger.token,
        })
    }
}

/// Instance config, loaded once per call.
struct Ledger {
    admin: Address,
    token: Address,
}

impl Ledger {
    fn load(env: &Env) -> Result<Self, Error> {
        let store = env.storage().instance();
        let admin = store.get(&DataKey::Admin).ok_or(Error::NotInitialized)?;
        let token = store.get(&DataKey::Token).ok_or(Error::NotInitialized)?;
        Ok(Ledger { admin, token })
    }

    fn held(&self, env: &Env) -> i128 {
        TokenClient::new(env, &self.token).balance(&env.current_contract_address())
    }

    /// Sum of every bucket, derived from the running totals.
    fn booked_total(&self, env: &Env) -> Result<i128, Error> {
        read_i128(env, &DataKey::TotalReceived)
            .checked_sub(read_i128(env, &DataKey::TotalReleased))
            .ok_or(Error::Overflow)
    }
}

fn read_i128(env: &Env, key: &DataKey) -> i128 {
    env.storage().persistent().get(key).unwrap_or(0)
}

/// Add `delta` to a persistent counter and refresh its TTL.
fn bump(env: &Env, key: DataKey, delta: i128) -> Result<(), Error> {
    let value = read_i128(env, &key).checked_add(delta).ok_or(Error::Overflow)?;
    env.storage().persistent().set(&key, &value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
    Ok(())
}
