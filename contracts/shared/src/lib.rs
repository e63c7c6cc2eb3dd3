//! Shared utilities and data structures for Stellarcade contracts.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contracterror, contracttype, symbol_short, Symbol};

/// Common error codes used across all contracts.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Error {
    InvalidAmount = 1,
    InvalidFeeConfig = 2,
    Overflow = 3,
}

/// Constant for basis points divisor.
pub const BASIS_POINTS_DIVISOR: u32 = 10_000;

/// Upper bound for any single fee share (10%).
pub const MAX_FEE_BPS: u32 = 1_000;

/// Treasury purpose tag for the platform's cut of a settled game.
pub const GAME_FEE_PURPOSE: Symbol = symbol_short!("gamefee");

/// Treasury purpose tag for the liquidity share of a settled game.
pub const LIQUIDITY_FEE_PURPOSE: Symbol = symbol_short!("liqfee");

/// How a settled pool is divided. The three shares always sum to the pool.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutSplit {
    pub pool: i128,
    pub game_fee: i128,
    pub liquidity_fee: i128,
    pub reward: i128,
}

/// Helper to calculate fee based on amount and basis points.
pub fn calculate_fee(amount: i128, fee_bps: u32) -> Result<i128, Error> {
    if amount < 0 {
        return Err(Error::InvalidAmount);
    }
    if fee_bps > BASIS_POINTS_DIVISOR {
        return Err(Error::InvalidFeeConfig);
    }
    amount
        .checked_mul(fee_bps as i128)
        .and_then(|v| v.checked_div(BASIS_POINTS_DIVISOR as i128))
        .ok_or(Error::Overflow)
}

/// Reject any fee share above `MAX_FEE_BPS`.
pub fn validate_fee_bps(game_fee_bps: u32, liquidity_fee_bps: u32) -> Result<(), Error> {
    if game_fee_bps > MAX_FEE_BPS || liquidity_fee_bps > MAX_FEE_BPS {
        return Err(Error::InvalidFeeConfig);
    }
    Ok(())
}

/// Split `pool` into the two floored fee shares and the winner's remainder.
///
/// Only the fee calculation floors; the reward absorbs whatever is left, so
/// no unit of the pool is lost to truncation.
pub fn split_pool(
    pool: i128,
    game_fee_bps: u32,
    liquidity_fee_bps: u32,
) -> Result<PayoutSplit, Error> {
    validate_fee_bps(game_fee_bps, liquidity_fee_bps)?;

    let game_fee = calculate_fee(pool, game_fee_bps)?;
    let liquidity_fee = calculate_fee(pool, liquidity_fee_bps)?;
    let reward = pool
        .checked_sub(game_fee)
        .and_then(|v| v.checked_sub(liquidity_fee))
        .ok_or(Error::Overflow)?;

    Ok(PayoutSplit {
        pool,
        game_fee,
        liquidity_fee,
        reward,
    })
}
