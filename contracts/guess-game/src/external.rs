//! Calls out to collaborator contracts.
//!
//! Every call goes through the `try_` client variant so a failing
//! collaborator surfaces as this contract's own error. Returning that error
//! rolls back the whole invocation, including writes made before the call.

use soroban_sdk::{contractclient, token::TokenClient, Address, Env, Symbol, Vec};
use stellarcade_reveal_oracle::RevealOracleClient;

use crate::Error;

/// Fee sink interface. Fees are transferred first, then booked.
#[contractclient(name = "FeeTreasuryClient")]
pub trait FeeTreasury {
    fn receive_fee(env: Env, from: Address, purpose: Symbol, amount: i128);
}

/// Move `amount` of `token` from `from` to `to`.
pub fn transfer(env: &Env, token: &Address, from: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    match TokenClient::new(env, token).try_transfer(from, to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(Error::TransferFailed),
    }
}

/// Send a fee share to the treasury and book it under `purpose`.
pub fn forward_fee(
    env: &Env,
    token: &Address,
    treasury: &Address,
    purpose: &Symbol,
    amount: i128,
) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }

    let this = env.current_contract_address();
    transfer(env, token, &this, treasury, amount)?;

    match FeeTreasuryClient::new(env, treasury).try_receive_fee(&this, purpose, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(Error::TransferFailed),
    }
}

/// Verified numbers of `(game_id, round_id)` in roster order.
pub fn revealed_numbers(
    env: &Env,
    reveal_oracle: &Address,
    game_id: u64,
    round_id: u32,
) -> Result<Vec<u32>, Error> {
    match RevealOracleClient::new(env, reveal_oracle).try_get_revealed_numbers(&game_id, &round_id) {
        Ok(Ok(numbers)) => Ok(numbers),
        _ => Err(Error::RevealUnavailable),
    }
}
