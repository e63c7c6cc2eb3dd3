//! Settlement & payout.
//!
//! Runs after every processed round. With more than one point-holder left
//! the next round opens immediately; with one left the pooled stake is split
//! between the two fee shares and the winner; with none left the game ends
//! without a payout.
//!
//! The game is marked `Concluded` and saved before any token moves, so a
//! re-entrant call sees a settled game and stops.

use soroban_sdk::{Address, Env, Vec};

use shared::{split_pool, GAME_FEE_PURPOSE, LIQUIDITY_FEE_PURPOSE};

use crate::resolution::Seat;
use crate::{external, session, storage};
use crate::{Error, GameAbandoned, GameConfig, GameData, GameSettled, GameStatus, MAX_PLAYERS};

pub fn conclude_round(
    env: &Env,
    config: &GameConfig,
    game: &mut GameData,
    roster: &Vec<Address>,
    seats: &[Seat],
) -> Result<(), Error> {
    let mut survivors = 0u32;
    let mut last_survivor = None;
    for (i, seat) in seats.iter().enumerate() {
        if seat.is_active() {
            survivors += 1;
            last_survivor = Some(i as u32);
        }
    }

    match (survivors, last_survivor) {
        (1, Some(idx)) => pay_winner(env, config, game, roster.get_unchecked(idx)),
        (0, _) => {
            game.status = GameStatus::Concluded;
            storage::set_game(env, game);

            GameAbandoned {
                game_id: game.game_id,
                round_id: game.round_id,
            }
            .publish(env);
            Ok(())
        }
        _ => crate::open_round(env, game, roster),
    }
}

fn pay_winner(env: &Env, config: &GameConfig, game: &mut GameData, winner: Address) -> Result<(), Error> {
    let pool = config
        .entry_stake
        .checked_mul(MAX_PLAYERS as i128)
        .ok_or(Error::Overflow)?;
    let split = split_pool(pool, config.game_fee_bps, config.liquidity_fee_bps)?;

    game.status = GameStatus::Concluded;
    game.winner = Some(winner.clone());
    storage::set_game(env, game);
    session::release_slot(env, &winner, game.game_id);

    external::forward_fee(env, &config.token, &config.treasury, &GAME_FEE_PURPOSE, split.game_fee)?;
    external::forward_fee(
        env,
        &config.token,
        &config.treasury,
        &LIQUIDITY_FEE_PURPOSE,
        split.liquidity_fee,
    )?;
    external::transfer(
        env,
        &config.token,
        &env.current_contract_address(),
        &winner,
        split.reward,
    )?;

    GameSettled {
        game_id: game.game_id,
        winner,
        reward: split.reward,
        game_fee: split.game_fee,
        liquidity_fee: split.liquidity_fee,
    }
    .publish(env);

    Ok(())
}
