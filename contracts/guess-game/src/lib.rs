//! Stellarcade Guess Royale Contract
//!
//! A five-player, wagered elimination game. Every round each player seals a
//! guess between 0 and 100; once the window closes the reveal oracle
//! publishes the plaintext numbers and the round is scored against 0.8x the
//! average guess. Losers drop points, players at zero are eliminated, and the
//! last player standing takes the pooled stakes minus the game and
//! liquidity fees.
//!
//! ## Game Flow
//! 1. `init` stores the config and opens game 1.
//! 2. Players `enroll` into the open game (see `find_open_game`), paying the
//!    entry stake.
//! 3. An operator calls `start_game` on a full roster; the next open game is
//!    created at the same time.
//! 4. An operator calls `start_round`; players `submit_number` with an opaque
//!    commitment during the `ROUND_WINDOW_SECS` window.
//! 5. The oracle publishes the round's numbers on the reveal contract.
//! 6. An operator calls `process_round` after the window. The round is
//!    scored, and either the next round opens or the game settles.
//!
//! ## Authorization
//! Privileged calls take the caller's address, require its signature and
//! check it against the operator table. The admin always counts as an
//! operator.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Bytes, Env, Vec,
};

mod external;
pub mod resolution;
pub mod session;
mod settlement;
pub mod storage;

use resolution::{ResolutionRule, Seat, MAX_NUMBER, MAX_SEATS};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Players in a full game.
pub const MAX_PLAYERS: u32 = 5;
/// Points every player starts a game with.
pub const STARTING_POINTS: u32 = 10;
/// Length of a round's submission window, in ledger seconds.
pub const ROUND_WINDOW_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized     = 2,
    NotAuthorized      = 3,
    InvalidGameId      = 4,
    GameNotFound       = 5,
    /// Game is full or no longer forming.
    NotOpen            = 6,
    AlreadyEnrolled    = 7,
    /// The address already occupies the maximum number of games.
    CapacityExceeded   = 8,
    InvalidStake       = 9,
    TransferFailed     = 10,
    NotFull            = 11,
    AlreadyActive      = 12,
    NotActive          = 13,
    RoundInProgress    = 14,
    RoundNotOpen       = 15,
    WindowClosed       = 16,
    WindowStillOpen    = 17,
    NotEnrolled        = 18,
    Eliminated         = 19,
    AlreadySubmitted   = 20,
    InvalidCommitment  = 21,
    RevealUnavailable  = 22,
    /// Published numbers do not line up with the roster.
    InvalidReveal      = 23,
    AlreadySettled     = 24,
    InvalidFeeConfig   = 25,
    Overflow           = 26,
}

impl From<shared::Error> for Error {
    fn from(err: shared::Error) -> Self {
        match err {
            shared::Error::InvalidAmount => Error::InvalidStake,
            shared::Error::InvalidFeeConfig => Error::InvalidFeeConfig,
            shared::Error::Overflow => Error::Overflow,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GameStatus {
    Forming = 0,
    Active = 1,
    Concluded = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameData {
    pub game_id: u64,
    pub status: GameStatus,
    pub round_id: u32,
    /// 0 while no round is open.
    pub round_start_time: u64,
    pub player_count: u32,
    pub winner: Option<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerData {
    pub points: u32,
    pub has_submitted: bool,
    /// Opaque sealed guess for the current round; empty between rounds.
    pub commitment: Bytes,
    /// Only meaningful if `has_submitted` was set for the last processed round.
    pub revealed_number: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameConfig {
    pub token: Address,
    pub reveal_oracle: Address,
    pub treasury: Address,
    pub entry_stake: i128,
    pub game_fee_bps: u32,
    pub liquidity_fee_bps: u32,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    #[topic]
    pub admin: Address,
    pub token: Address,
    pub entry_stake: i128,
}

#[contractevent]
pub struct OperatorUpdated {
    #[topic]
    pub operator: Address,
    pub enabled: bool,
}

#[contractevent]
pub struct FeesUpdated {
    pub game_fee_bps: u32,
    pub liquidity_fee_bps: u32,
}

#[contractevent]
pub struct GameCreated {
    #[topic]
    pub game_id: u64,
}

#[contractevent]
pub struct PlayerEnrolled {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub player: Address,
    pub player_count: u32,
}

#[contractevent]
pub struct GameStarted {
    #[topic]
    pub game_id: u64,
    pub next_game_id: u64,
}

#[contractevent]
pub struct RoundStarted {
    #[topic]
    pub game_id: u64,
    pub round_id: u32,
    pub start_time: u64,
}

#[contractevent]
pub struct NumberSubmitted {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub player: Address,
    pub round_id: u32,
}

#[contractevent]
pub struct RoundResolved {
    #[topic]
    pub game_id: u64,
    pub round_id: u32,
    pub rule: ResolutionRule,
    /// 0 if the round ended on timeouts before a target was computed.
    pub target: u64,
}

#[contractevent]
pub struct PlayerEliminated {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub player: Address,
    pub round_id: u32,
}

#[contractevent]
pub struct GameSettled {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub winner: Address,
    pub reward: i128,
    pub game_fee: i128,
    pub liquidity_fee: i128,
}

#[contractevent]
pub struct GameAbandoned {
    #[topic]
    pub game_id: u64,
    pub round_id: u32,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct GuessGame;

#[contractimpl]
impl GuessGame {
    /// Initialize the game contract and open game 1. May only be called once.
    ///
    /// `token` is the SEP-41 asset stakes are paid in. Fee shares are in
    /// basis points and capped at `shared::MAX_FEE_BPS` each.
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        reveal_oracle: Address,
        treasury: Address,
        entry_stake: i128,
        game_fee_bps: u32,
        liquidity_fee_bps: u32,
    ) -> Result<(), Error> {
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        if entry_stake <= 0 {
            return Err(Error::InvalidStake);
        }
        shared::validate_fee_bps(game_fee_bps, liquidity_fee_bps)?;

        env.storage().instance().set(&storage::DataKey::Admin, &admin);
        storage::set_config(
            &env,
            &GameConfig {
                token: token.clone(),
                reveal_oracle,
                treasury,
                entry_stake,
                game_fee_bps,
                liquidity_fee_bps,
            },
        );

        Initialized {
            admin,
            token,
            entry_stake,
        }
        .publish(&env);

        open_new_game(&env)?;

        Ok(())
    }

    /// Grant or revoke operator rights. Admin only.
    pub fn set_operator(env: Env, admin: Address, operator: Address, enabled: bool) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        storage::set_operator(&env, &operator, enabled);
        OperatorUpdated { operator, enabled }.publish(&env);

        Ok(())
    }

    /// Change both fee shares. Admin only; each share is capped at 10%.
    pub fn set_fees(env: Env, admin: Address, game_fee_bps: u32, liquidity_fee_bps: u32) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        shared::validate_fee_bps(game_fee_bps, liquidity_fee_bps)?;

        let mut config = storage::get_config(&env)?;
        config.game_fee_bps = game_fee_bps;
        config.liquidity_fee_bps = liquidity_fee_bps;
        storage::set_config(&env, &config);

        FeesUpdated {
            game_fee_bps,
            liquidity_fee_bps,
        }
        .publish(&env);

        Ok(())
    }

    /// Open an extra forming game. Admin only.
    pub fn create_game(env: Env, admin: Address) -> Result<u64, Error> {
        require_admin(&env, &admin)?;
        open_new_game(&env)
    }

    /// Join `game_id`, paying `stake` (must equal the configured entry stake).
    ///
    /// All bookkeeping is written before the stake is pulled; a failed
    /// transfer aborts the call and nothing is kept.
    pub fn enroll(env: Env, game_id: u64, player: Address, stake: i128) -> Result<(), Error> {
        require_initialized(&env)?;

        player.require_auth();

        let config = storage::get_config(&env)?;
        let mut game = storage::get_game(&env, game_id)?;

        if game.status != GameStatus::Forming || game.player_count >= MAX_PLAYERS {
            return Err(Error::NotOpen);
        }
        if storage::has_player(&env, game_id, &player) {
            return Err(Error::AlreadyEnrolled);
        }
        session::ensure_capacity(&env, &player)?;
        if stake != config.entry_stake {
            return Err(Error::InvalidStake);
        }

        storage::set_player(
            &env,
            game_id,
            &player,
            &PlayerData {
                points: STARTING_POINTS,
                has_submitted: false,
                commitment: Bytes::new(&env),
                revealed_number: 0,
            },
        );

        let mut roster = storage::get_roster(&env, game_id);
        roster.push_back(player.clone());
        storage::set_roster(&env, game_id, &roster);

        game.player_count = game.player_count.checked_add(1).ok_or(Error::Overflow)?;
        storage::set_game(&env, &game);

        session::reserve_slot(&env, &player, game_id)?;

        external::transfer(
            &env,
            &config.token,
            &player,
            &env.current_contract_address(),
            stake,
        )?;

        PlayerEnrolled {
            game_id,
            player,
            player_count: game.player_count,
        }
        .publish(&env);

        Ok(())
    }

    /// Activate a full roster and open the next game. Operator only.
    pub fn start_game(env: Env, operator: Address, game_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        require_operator(&env, &operator)?;

        let mut game = storage::get_game(&env, game_id)?;
        if game.status != GameStatus::Forming {
            return Err(Error::AlreadyActive);
        }
        if game.player_count < MAX_PLAYERS {
            return Err(Error::NotFull);
        }

        game.status = GameStatus::Active;
        game.round_id = 0;
        game.round_start_time = 0;
        storage::set_game(&env, &game);

        let next_game_id = open_new_game(&env)?;
        advance_open_cursor(&env);

        GameStarted {
            game_id,
            next_game_id,
        }
        .publish(&env);

        Ok(())
    }

    /// Open the submission window of the next round. Operator only.
    pub fn start_round(env: Env, operator: Address, game_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        require_operator(&env, &operator)?;

        let mut game = storage::get_game(&env, game_id)?;
        ensure_active(&game)?;
        if game.round_start_time != 0 {
            return Err(Error::RoundInProgress);
        }

        let roster = storage::get_roster(&env, game_id);
        open_round(&env, &mut game, &roster)
    }

    /// Record a player's sealed guess for the open round.
    pub fn submit_number(env: Env, game_id: u64, player: Address, commitment: Bytes) -> Result<(), Error> {
        require_initialized(&env)?;

        player.require_auth();

        if commitment.is_empty() {
            return Err(Error::InvalidCommitment);
        }

        let game = storage::get_game(&env, game_id)?;
        ensure_active(&game)?;
        if game.round_start_time == 0 {
            return Err(Error::RoundNotOpen);
        }
        if env.ledger().timestamp() > window_end(&game)? {
            return Err(Error::WindowClosed);
        }

        let mut data = storage::get_player(&env, game_id, &player)?;
        if data.points == 0 {
            return Err(Error::Eliminated);
        }
        if data.has_submitted {
            return Err(Error::AlreadySubmitted);
        }

        data.has_submitted = true;
        data.commitment = commitment;
        storage::set_player(&env, game_id, &player, &data);

        NumberSubmitted {
            game_id,
            player,
            round_id: game.round_id,
        }
        .publish(&env);

        Ok(())
    }

    /// Score the closed round, then continue or settle the game. Operator only.
    pub fn process_round(env: Env, operator: Address, game_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        require_operator(&env, &operator)?;

        let mut game = storage::get_game(&env, game_id)?;
        ensure_active(&game)?;
        if game.round_start_time == 0 {
            return Err(Error::RoundNotOpen);
        }
        if env.ledger().timestamp() <= window_end(&game)? {
            return Err(Error::WindowStillOpen);
        }

        let config = storage::get_config(&env)?;
        let numbers = external::revealed_numbers(&env, &config.reveal_oracle, game_id, game.round_id)?;
        let roster = storage::get_roster(&env, game_id);
        if numbers.len() != roster.len() {
            return Err(Error::InvalidReveal);
        }

        let mut seats = [Seat::default(); MAX_SEATS];
        let seat_count = roster.len() as usize;
        for (i, player) in roster.iter().enumerate() {
            let data = storage::get_player(&env, game_id, &player)?;
            let number = numbers.get_unchecked(i as u32);
            let counts = data.has_submitted && data.points > 0;
            if counts && number > MAX_NUMBER {
                return Err(Error::InvalidReveal);
            }
            seats[i] = Seat {
                points: data.points,
                submitted: data.has_submitted,
                number,
            };
        }

        let seats = &mut seats[..seat_count];
        let outcome = resolution::resolve(seats);

        for (i, player) in roster.iter().enumerate() {
            let mut data = storage::get_player(&env, game_id, &player)?;
            if data.has_submitted {
                data.revealed_number = seats[i].number;
            }
            data.points = seats[i].points;
            storage::set_player(&env, game_id, &player, &data);

            if outcome.eliminated[i] {
                session::release_slot(&env, &player, game_id);
                PlayerEliminated {
                    game_id,
                    player,
                    round_id: game.round_id,
                }
                .publish(&env);
            }
        }

        game.round_start_time = 0;

        RoundResolved {
            game_id,
            round_id: game.round_id,
            rule: outcome.rule,
            target: outcome.target.unwrap_or(0),
        }
        .publish(&env);

        settlement::conclude_round(&env, &config, &mut game, &roster, seats)
    }

    // -----------------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------------

    pub fn get_game(env: Env, game_id: u64) -> Result<GameData, Error> {
        require_initialized(&env)?;
        storage::get_game(&env, game_id)
    }

    pub fn get_roster(env: Env, game_id: u64) -> Result<Vec<Address>, Error> {
        require_initialized(&env)?;
        storage::get_game(&env, game_id)?;
        Ok(storage::get_roster(&env, game_id))
    }

    pub fn get_player(env: Env, game_id: u64, player: Address) -> Result<PlayerData, Error> {
        require_initialized(&env)?;
        storage::get_game(&env, game_id)?;
        storage::get_player(&env, game_id, &player)
    }

    pub fn get_points(env: Env, game_id: u64, player: Address) -> Result<u32, Error> {
        Ok(Self::get_player(env, game_id, player)?.points)
    }

    /// Commitments of the current round in roster order (empty if not submitted).
    pub fn get_commitments(env: Env, game_id: u64) -> Result<Vec<Bytes>, Error> {
        require_initialized(&env)?;
        storage::get_game(&env, game_id)?;

        let mut out = Vec::new(&env);
        for player in storage::get_roster(&env, game_id).iter() {
            out.push_back(storage::get_player(&env, game_id, &player)?.commitment);
        }
        Ok(out)
    }

    /// Lowest-id game still accepting players, or the newest game if none is.
    pub fn find_open_game(env: Env) -> Result<u64, Error> {
        require_initialized(&env)?;

        let last = storage::last_game_id(&env);
        let mut game_id = storage::open_cursor(&env);
        while game_id <= last {
            if let Some(game) = storage::try_get_game(&env, game_id) {
                if is_open(&game) {
                    return Ok(game_id);
                }
            }
            game_id += 1;
        }

        Ok(last)
    }

    /// Games `player` currently holds a session slot in.
    pub fn active_games(env: Env, player: Address) -> Result<Vec<u64>, Error> {
        require_initialized(&env)?;
        Ok(session::active_games(&env, &player))
    }

    pub fn get_config(env: Env) -> Result<GameConfig, Error> {
        storage::get_config(&env)
    }

    pub fn is_operator(env: Env, address: Address) -> Result<bool, Error> {
        let admin = storage::get_admin(&env)?;
        Ok(address == admin || storage::is_operator(&env, &address))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !storage::is_initialized(env) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin = storage::get_admin(env)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn require_operator(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin = storage::get_admin(env)?;
    caller.require_auth();
    if caller != &admin && !storage::is_operator(env, caller) {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn ensure_active(game: &GameData) -> Result<(), Error> {
    match game.status {
        GameStatus::Active => Ok(()),
        GameStatus::Concluded => Err(Error::AlreadySettled),
        GameStatus::Forming => Err(Error::NotActive),
    }
}

fn is_open(game: &GameData) -> bool {
    game.status == GameStatus::Forming && game.player_count < MAX_PLAYERS
}

fn window_end(game: &GameData) -> Result<u64, Error> {
    game.round_start_time
        .checked_add(ROUND_WINDOW_SECS)
        .ok_or(Error::Overflow)
}

fn open_new_game(env: &Env) -> Result<u64, Error> {
    let game_id = storage::last_game_id(env)
        .checked_add(1)
        .ok_or(Error::Overflow)?;

    storage::set_game(
        env,
        &GameData {
            game_id,
            status: GameStatus::Forming,
            round_id: 0,
            round_start_time: 0,
            player_count: 0,
            winner: None,
        },
    );
    storage::set_roster(env, game_id, &Vec::new(env));
    storage::set_last_game_id(env, game_id);

    GameCreated { game_id }.publish(env);

    Ok(game_id)
}

/// Move the open-game cursor past games that can no longer take players.
fn advance_open_cursor(env: &Env) {
    let last = storage::last_game_id(env);
    let mut cursor = storage::open_cursor(env);
    while cursor < last {
        match storage::try_get_game(env, cursor) {
            Some(game) if is_open(&game) => break,
            _ => cursor += 1,
        }
    }
    storage::set_open_cursor(env, cursor);
}

/// Clear every seat's submission and open a new window at the current time.
pub(crate) fn open_round(env: &Env, game: &mut GameData, roster: &Vec<Address>) -> Result<(), Error> {
    for player in roster.iter() {
        let mut data = storage::get_player(env, game.game_id, &player)?;
        data.has_submitted = false;
        data.commitment = Bytes::new(env);
        storage::set_player(env, game.game_id, &player, &data);
    }

    game.round_id = game.round_id.checked_add(1).ok_or(Error::Overflow)?;
    game.round_start_time = env.ledger().timestamp();
    storage::set_game(env, game);

    RoundStarted {
        game_id: game.game_id,
        round_id: game.round_id,
        start_time: game.round_start_time,
    }
    .publish(env);

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test;
