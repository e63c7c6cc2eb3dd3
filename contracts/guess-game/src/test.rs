#![cfg(test)]

use super::*;
use soroban_sdk::{
    testutils::{Address as _, Events as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Bytes, Env,
};
use stellarcade_reveal_oracle::{RevealOracle, RevealOracleClient};
use stellarcade_treasury::{Treasury, TreasuryClient};

// -------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------

const STAKE: i128 = 1_000;
const GAME_FEE_BPS: u32 = 150;
const LIQUIDITY_FEE_BPS: u32 = 500;
const START_TIME: u64 = 1_000;

struct Setup<'a> {
    game: GuessGameClient<'a>,
    game_id: Address,
    reveal: RevealOracleClient<'a>,
    treasury: TreasuryClient<'a>,
    treasury_id: Address,
    admin: Address,
    oracle: Address,
    token: Address,
    token_sac: StellarAssetClient<'a>,
}

fn setup(env: &Env) -> Setup<'_> {
    env.mock_all_auths();
    env.ledger().set_timestamp(START_TIME);

    let admin = Address::generate(env);
    let oracle = Address::generate(env);
    let token_admin = Address::generate(env);

    let token_contract = env.register_stellar_asset_contract_v2(token_admin);
    let token = token_contract.address();
    let token_sac = StellarAssetClient::new(env, &token);

    let reveal_id = env.register(RevealOracle, ());
    let reveal = RevealOracleClient::new(env, &reveal_id);
    reveal.init(&admin, &oracle);

    let treasury_id = env.register(Treasury, ());
    let treasury = TreasuryClient::new(env, &treasury_id);
    treasury.init(&admin, &token);

    let game_id = env.register(GuessGame, ());
    let game = GuessGameClient::new(env, &game_id);
    game.init(
        &admin,
        &token,
        &reveal_id,
        &treasury_id,
        &STAKE,
        &GAME_FEE_BPS,
        &LIQUIDITY_FEE_BPS,
    );

    Setup {
        game,
        game_id,
        reveal,
        treasury,
        treasury_id,
        admin,
        oracle,
        token,
        token_sac,
    }
}

fn funded_player(env: &Env, s: &Setup) -> Address {
    let player = Address::generate(env);
    s.token_sac.mint(&player, &(STAKE * 10));
    player
}

/// Enroll five funded players into `game_id`.
fn fill_game(env: &Env, s: &Setup, game_id: u64) -> [Address; 5] {
    let players = [
        funded_player(env, s),
        funded_player(env, s),
        funded_player(env, s),
        funded_player(env, s),
        funded_player(env, s),
    ];
    for p in players.iter() {
        s.game.enroll(&game_id, p, &STAKE);
    }
    players
}

/// Full game 1, started, with round 1 open.
fn running_game(env: &Env, s: &Setup) -> [Address; 5] {
    let players = fill_game(env, s, 1);
    s.game.start_game(&s.admin, &1);
    s.game.start_round(&s.admin, &1);
    players
}

fn sealed(env: &Env, tag: u8) -> Bytes {
    Bytes::from_array(env, &[0xc0, tag, 0x5e, 0xa1])
}

fn close_window(env: &Env) {
    let now = env.ledger().timestamp();
    env.ledger().set_timestamp(now + ROUND_WINDOW_SECS + 1);
}

fn reveal_round(env: &Env, s: &Setup, game_id: u64, numbers: [u32; 5]) {
    let round_id = s.game.get_game(&game_id).round_id;
    let list = Vec::from_array(env, numbers);
    s.reveal.publish_reveal(&s.oracle, &game_id, &round_id, &list);
}

/// Submit for every player flagged in `submit`, reveal `numbers`, close the
/// window and process the round.
fn play_round(env: &Env, s: &Setup, players: &[Address; 5], submit: [bool; 5], numbers: [u32; 5]) {
    for (i, p) in players.iter().enumerate() {
        if submit[i] {
            s.game.submit_number(&1, p, &sealed(env, i as u8));
        }
    }
    reveal_round(env, s, 1, numbers);
    close_window(env);
    s.game.process_round(&s.admin, &1);
}

fn points(s: &Setup, players: &[Address; 5]) -> [u32; 5] {
    let mut out = [0; 5];
    for (i, p) in players.iter().enumerate() {
        out[i] = s.game.get_points(&1, p);
    }
    out
}

fn balance(env: &Env, token: &Address, who: &Address) -> i128 {
    TokenClient::new(env, token).balance(who)
}

// -------------------------------------------------------------------
// 1. Initialization and configuration
// -------------------------------------------------------------------

#[test]
fn test_init_opens_first_game() {
    let env = Env::default();
    let s = setup(&env);

    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Forming);
    assert_eq!(game.player_count, 0);
    assert_eq!(game.winner, None);
    assert_eq!(s.game.find_open_game(), 1);

    let config = s.game.get_config();
    assert_eq!(config.entry_stake, STAKE);
    assert_eq!(config.treasury, s.treasury_id);
}

#[test]
fn test_init_rejects_reinit() {
    let env = Env::default();
    let s = setup(&env);

    let result = s.game.try_init(
        &s.admin,
        &s.token,
        &s.treasury_id,
        &s.treasury_id,
        &STAKE,
        &0,
        &0,
    );
    assert_eq!(result, Err(Ok(Error::AlreadyInitialized)));
}

#[test]
fn test_init_rejects_bad_config() {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);
    let other = Address::generate(&env);
    let contract_id = env.register(GuessGame, ());
    let game = GuessGameClient::new(&env, &contract_id);

    let over_cap = game.try_init(&admin, &other, &other, &other, &STAKE, &1_001, &0);
    assert_eq!(over_cap, Err(Ok(Error::InvalidFeeConfig)));

    let zero_stake = game.try_init(&admin, &other, &other, &other, &0, &0, &0);
    assert_eq!(zero_stake, Err(Ok(Error::InvalidStake)));

    assert_eq!(game.try_find_open_game(), Err(Ok(Error::NotInitialized)));
}

#[test]
fn test_set_fees_admin_only_and_capped() {
    let env = Env::default();
    let s = setup(&env);
    let stranger = Address::generate(&env);

    assert_eq!(
        s.game.try_set_fees(&stranger, &100, &100),
        Err(Ok(Error::NotAuthorized))
    );
    assert_eq!(
        s.game.try_set_fees(&s.admin, &100, &1_500),
        Err(Ok(Error::InvalidFeeConfig))
    );

    s.game.set_fees(&s.admin, &1_000, &0);
    let config = s.game.get_config();
    assert_eq!(config.game_fee_bps, 1_000);
    assert_eq!(config.liquidity_fee_bps, 0);
}

#[test]
fn test_operator_grant_and_revoke() {
    let env = Env::default();
    let s = setup(&env);
    let operator = Address::generate(&env);

    assert!(s.game.is_operator(&s.admin));
    assert!(!s.game.is_operator(&operator));

    assert_eq!(
        s.game.try_set_operator(&operator, &operator, &true),
        Err(Ok(Error::NotAuthorized))
    );

    s.game.set_operator(&s.admin, &operator, &true);
    assert!(s.game.is_operator(&operator));

    fill_game(&env, &s, 1);
    s.game.start_game(&operator, &1);
    s.game.start_round(&operator, &1);

    s.game.set_operator(&s.admin, &operator, &false);
    assert!(!s.game.is_operator(&operator));
    close_window(&env);
    assert_eq!(
        s.game.try_process_round(&operator, &1),
        Err(Ok(Error::NotAuthorized))
    );
}

// -------------------------------------------------------------------
// 2. Enrollment
// -------------------------------------------------------------------

#[test]
fn test_enroll_takes_stake_and_seats_player() {
    let env = Env::default();
    let s = setup(&env);
    let player = funded_player(&env, &s);

    s.game.enroll(&1, &player, &STAKE);

    assert_eq!(balance(&env, &s.token, &player), STAKE * 9);
    assert_eq!(balance(&env, &s.token, &s.game_id), STAKE);
    assert_eq!(s.game.get_roster(&1), vec![&env, player.clone()]);
    assert_eq!(s.game.get_game(&1).player_count, 1);
    assert_eq!(s.game.active_games(&player), vec![&env, 1u64]);

    let data = s.game.get_player(&1, &player);
    assert_eq!(data.points, STARTING_POINTS);
    assert!(!data.has_submitted);
    assert!(data.commitment.is_empty());
}

#[test]
fn test_enroll_rejections() {
    let env = Env::default();
    let s = setup(&env);
    let player = funded_player(&env, &s);

    assert_eq!(
        s.game.try_enroll(&0, &player, &STAKE),
        Err(Ok(Error::InvalidGameId))
    );
    assert_eq!(
        s.game.try_enroll(&99, &player, &STAKE),
        Err(Ok(Error::GameNotFound))
    );
    assert_eq!(
        s.game.try_enroll(&1, &player, &(STAKE - 1)),
        Err(Ok(Error::InvalidStake))
    );

    s.game.enroll(&1, &player, &STAKE);
    assert_eq!(
        s.game.try_enroll(&1, &player, &STAKE),
        Err(Ok(Error::AlreadyEnrolled))
    );
}

#[test]
fn test_enroll_rejects_sixth_player() {
    let env = Env::default();
    let s = setup(&env);
    fill_game(&env, &s, 1);

    let late = funded_player(&env, &s);
    assert_eq!(
        s.game.try_enroll(&1, &late, &STAKE),
        Err(Ok(Error::NotOpen))
    );
}

#[test]
fn test_failed_stake_transfer_rolls_back_enrollment() {
    let env = Env::default();
    let s = setup(&env);
    let broke = Address::generate(&env);

    assert_eq!(
        s.game.try_enroll(&1, &broke, &STAKE),
        Err(Ok(Error::TransferFailed))
    );

    assert_eq!(s.game.get_game(&1).player_count, 0);
    assert_eq!(s.game.get_roster(&1).len(), 0);
    assert_eq!(s.game.try_get_player(&1, &broke), Err(Ok(Error::NotEnrolled)));
    assert_eq!(s.game.active_games(&broke).len(), 0);
}

#[test]
fn test_session_capacity_caps_concurrent_games() {
    let env = Env::default();
    let s = setup(&env);
    let player = funded_player(&env, &s);

    for _ in 0..5 {
        s.game.create_game(&s.admin);
    }
    for game_id in 1..=5u64 {
        s.game.enroll(&game_id, &player, &STAKE);
    }
    assert_eq!(s.game.active_games(&player).len(), 5);

    assert_eq!(
        s.game.try_enroll(&6, &player, &STAKE),
        Err(Ok(Error::CapacityExceeded))
    );
}

#[test]
fn test_create_game_admin_only() {
    let env = Env::default();
    let s = setup(&env);
    let stranger = Address::generate(&env);

    assert_eq!(
        s.game.try_create_game(&stranger),
        Err(Ok(Error::NotAuthorized))
    );
    assert_eq!(s.game.create_game(&s.admin), 2);
    assert_eq!(s.game.get_game(&2).status, GameStatus::Forming);
}

// -------------------------------------------------------------------
// 3. Starting games and rounds
// -------------------------------------------------------------------

#[test]
fn test_start_game_requires_full_roster() {
    let env = Env::default();
    let s = setup(&env);
    let player = funded_player(&env, &s);
    s.game.enroll(&1, &player, &STAKE);

    assert_eq!(s.game.try_start_game(&s.admin, &1), Err(Ok(Error::NotFull)));
}

#[test]
fn test_start_game_activates_and_opens_next() {
    let env = Env::default();
    let s = setup(&env);
    fill_game(&env, &s, 1);

    let stranger = Address::generate(&env);
    assert_eq!(
        s.game.try_start_game(&stranger, &1),
        Err(Ok(Error::NotAuthorized))
    );

    s.game.start_game(&s.admin, &1);

    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Active);
    assert_eq!(game.round_id, 0);
    assert_eq!(game.round_start_time, 0);

    assert_eq!(s.game.get_game(&2).status, GameStatus::Forming);
    assert_eq!(s.game.find_open_game(), 2);

    assert_eq!(
        s.game.try_start_game(&s.admin, &1),
        Err(Ok(Error::AlreadyActive))
    );
}

#[test]
fn test_find_open_game_prefers_lowest_open_id() {
    let env = Env::default();
    let s = setup(&env);
    s.game.create_game(&s.admin);
    s.game.create_game(&s.admin);

    fill_game(&env, &s, 1);
    s.game.start_game(&s.admin, &1);

    // game 2 is still forming and was created before game 4.
    assert_eq!(s.game.find_open_game(), 2);

    fill_game(&env, &s, 2);
    assert_eq!(s.game.find_open_game(), 3);
}

#[test]
fn test_start_round_rules() {
    let env = Env::default();
    let s = setup(&env);
    fill_game(&env, &s, 1);

    assert_eq!(
        s.game.try_start_round(&s.admin, &1),
        Err(Ok(Error::NotActive))
    );

    s.game.start_game(&s.admin, &1);
    s.game.start_round(&s.admin, &1);

    let game = s.game.get_game(&1);
    assert_eq!(game.round_id, 1);
    assert_eq!(game.round_start_time, START_TIME);

    assert_eq!(
        s.game.try_start_round(&s.admin, &1),
        Err(Ok(Error::RoundInProgress))
    );
}

// -------------------------------------------------------------------
// 4. Submissions
// -------------------------------------------------------------------

#[test]
fn test_submit_records_commitment() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    let commitment = sealed(&env, 7);
    s.game.submit_number(&1, &players[2], &commitment);

    let data = s.game.get_player(&1, &players[2]);
    assert!(data.has_submitted);
    assert_eq!(data.commitment, commitment);

    let commitments = s.game.get_commitments(&1);
    assert_eq!(commitments.len(), 5);
    assert_eq!(commitments.get_unchecked(2), commitment);
    assert!(commitments.get_unchecked(0).is_empty());

    assert_eq!(
        s.game.try_submit_number(&1, &players[2], &sealed(&env, 8)),
        Err(Ok(Error::AlreadySubmitted))
    );
}

#[test]
fn test_submit_rejections() {
    let env = Env::default();
    let s = setup(&env);
    let players = fill_game(&env, &s, 1);

    s.game.start_game(&s.admin, &1);
    assert_eq!(
        s.game.try_submit_number(&1, &players[0], &sealed(&env, 0)),
        Err(Ok(Error::RoundNotOpen))
    );

    s.game.start_round(&s.admin, &1);

    let outsider = Address::generate(&env);
    assert_eq!(
        s.game.try_submit_number(&1, &outsider, &sealed(&env, 0)),
        Err(Ok(Error::NotEnrolled))
    );
    assert_eq!(
        s.game.try_submit_number(&1, &players[0], &Bytes::new(&env)),
        Err(Ok(Error::InvalidCommitment))
    );

    // last second of the window still counts.
    env.ledger().set_timestamp(START_TIME + ROUND_WINDOW_SECS);
    s.game.submit_number(&1, &players[0], &sealed(&env, 0));

    close_window(&env);
    assert_eq!(
        s.game.try_submit_number(&1, &players[1], &sealed(&env, 1)),
        Err(Ok(Error::WindowClosed))
    );
}

// -------------------------------------------------------------------
// 5. Round processing
// -------------------------------------------------------------------

#[test]
fn test_process_round_waits_for_window() {
    let env = Env::default();
    let s = setup(&env);
    running_game(&env, &s);
    reveal_round(&env, &s, 1, [1, 2, 3, 4, 5]);

    env.ledger().set_timestamp(START_TIME + ROUND_WINDOW_SECS);
    assert_eq!(
        s.game.try_process_round(&s.admin, &1),
        Err(Ok(Error::WindowStillOpen))
    );
}

#[test]
fn test_process_round_needs_open_round() {
    let env = Env::default();
    let s = setup(&env);
    fill_game(&env, &s, 1);
    s.game.start_game(&s.admin, &1);

    assert_eq!(
        s.game.try_process_round(&s.admin, &1),
        Err(Ok(Error::RoundNotOpen))
    );
}

#[test]
fn test_process_round_without_reveal() {
    let env = Env::default();
    let s = setup(&env);
    running_game(&env, &s);
    close_window(&env);

    assert_eq!(
        s.game.try_process_round(&s.admin, &1),
        Err(Ok(Error::RevealUnavailable))
    );
}

#[test]
fn test_short_reveal_is_refused_and_round_recovers() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);
    for (i, p) in players.iter().enumerate() {
        s.game.submit_number(&1, p, &sealed(&env, i as u8));
    }

    let short = vec![&env, 10u32, 20, 30];
    assert_eq!(
        s.reveal.try_publish_reveal(&s.oracle, &1, &1, &short),
        Err(Ok(stellarcade_reveal_oracle::Error::InvalidLength))
    );

    close_window(&env);
    assert_eq!(
        s.game.try_process_round(&s.admin, &1),
        Err(Ok(Error::RevealUnavailable))
    );
    assert_eq!(s.game.get_game(&1).round_start_time, START_TIME);

    // The refused list left the key free, so the full list still lands.
    reveal_round(&env, &s, 1, [10, 20, 30, 40, 100]);
    s.game.process_round(&s.admin, &1);

    assert_eq!(points(&s, &players), [9, 9, 10, 9, 9]);
    assert_eq!(s.game.get_game(&1).round_id, 2);
}

#[test]
fn test_base_round_spares_closest_and_opens_next() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    play_round(&env, &s, &players, [true; 5], [10, 20, 30, 40, 100]);

    assert_eq!(points(&s, &players), [9, 9, 10, 9, 9]);
    assert_eq!(s.game.get_player(&1, &players[4]).revealed_number, 100);

    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Active);
    assert_eq!(game.round_id, 2);
    assert_eq!(game.round_start_time, env.ledger().timestamp());

    // submissions are cleared for the new round.
    let data = s.game.get_player(&1, &players[0]);
    assert!(!data.has_submitted);
    assert!(data.commitment.is_empty());
}

#[test]
fn test_tie_round_penalizes_tied_players() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    play_round(&env, &s, &players, [true; 5], [12, 20, 50, 9, 9]);

    assert_eq!(points(&s, &players), [9, 9, 10, 10, 10]);
}

#[test]
fn test_timeout_minority_still_scores_submitters() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    play_round(
        &env,
        &s,
        &players,
        [true, true, true, false, false],
        [10, 20, 30, 0, 0],
    );

    assert_eq!(points(&s, &players), [9, 10, 9, 8, 8]);
}

#[test]
fn test_exact_match_round_among_three_survivors() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    // The last two never submit and drop out; the middle guess is spared each time.
    for _ in 0..5 {
        play_round(
            &env,
            &s,
            &players,
            [true, true, true, false, false],
            [10, 20, 30, 0, 0],
        );
    }
    assert_eq!(points(&s, &players), [5, 10, 5, 0, 0]);
    assert_eq!(s.game.active_games(&players[3]).len(), 0);
    assert_eq!(s.game.active_games(&players[4]).len(), 0);

    // sum 75 over 3 -> target 20.00, hit exactly by the first player.
    play_round(
        &env,
        &s,
        &players,
        [true, true, true, false, false],
        [20, 10, 45, 0, 0],
    );

    assert_eq!(points(&s, &players), [5, 8, 3, 0, 0]);
    assert_eq!(s.game.get_player(&1, &players[0]).revealed_number, 20);
    assert_eq!(s.game.get_game(&1).round_id, 7);
    assert_eq!(s.game.active_games(&players[0]), vec![&env, 1u64]);
}

#[test]
fn test_extreme_bluff_round_between_two_survivors() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    for _ in 0..5 {
        play_round(
            &env,
            &s,
            &players,
            [true, true, false, false, false],
            [20, 40, 0, 0, 0],
        );
    }
    assert_eq!(points(&s, &players), [10, 10, 0, 0, 0]);

    // 0 against 100: only the 0-guesser pays, even though it was closer.
    play_round(
        &env,
        &s,
        &players,
        [true, true, false, false, false],
        [0, 100, 0, 0, 0],
    );

    assert_eq!(points(&s, &players), [9, 10, 0, 0, 0]);
    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Active);
    assert_eq!(game.round_id, 7);
    assert_eq!(s.game.active_games(&players[1]), vec![&env, 1u64]);
}

// -------------------------------------------------------------------
// 6. Settlement
// -------------------------------------------------------------------

#[test]
fn test_last_player_standing_is_paid() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    // Only the first player ever submits; the others time out 2 points a round.
    for _ in 0..5 {
        play_round(
            &env,
            &s,
            &players,
            [true, false, false, false, false],
            [50, 0, 0, 0, 0],
        );
    }

    assert!(event_count_for_contract(&env, &s.game_id) > 0);

    assert_eq!(points(&s, &players), [10, 0, 0, 0, 0]);

    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Concluded);
    assert_eq!(game.winner, Some(players[0].clone()));
    assert_eq!(game.round_id, 5);

    // pool 5000: 75 game fee, 250 liquidity fee, 4675 to the winner.
    assert_eq!(balance(&env, &s.token, &players[0]), STAKE * 9 + 4_675);
    assert_eq!(balance(&env, &s.token, &s.game_id), 0);
    assert_eq!(balance(&env, &s.token, &s.treasury_id), 325);
    assert_eq!(s.treasury.fees_received(&shared::GAME_FEE_PURPOSE), 75);
    assert_eq!(s.treasury.fees_received(&shared::LIQUIDITY_FEE_PURPOSE), 250);

    for p in players.iter() {
        assert_eq!(s.game.active_games(p).len(), 0);
    }

    assert_eq!(
        s.game.try_start_round(&s.admin, &1),
        Err(Ok(Error::AlreadySettled))
    );
    assert_eq!(
        s.game.try_submit_number(&1, &players[0], &sealed(&env, 0)),
        Err(Ok(Error::AlreadySettled))
    );

    // A second settlement attempt pays nothing.
    close_window(&env);
    assert_eq!(
        s.game.try_process_round(&s.admin, &1),
        Err(Ok(Error::AlreadySettled))
    );
    assert_eq!(balance(&env, &s.token, &players[0]), STAKE * 9 + 4_675);
    assert_eq!(balance(&env, &s.token, &s.treasury_id), 325);
    assert_eq!(s.treasury.fees_received(&shared::GAME_FEE_PURPOSE), 75);
    assert_eq!(s.game.get_game(&1).winner, Some(players[0].clone()));
}

#[test]
fn test_everyone_eliminated_ends_without_payout() {
    let env = Env::default();
    let s = setup(&env);
    let players = running_game(&env, &s);

    // Two submitters outlast the three silent players.
    for _ in 0..5 {
        play_round(
            &env,
            &s,
            &players,
            [true, true, false, false, false],
            [20, 40, 0, 0, 0],
        );
    }
    assert_eq!(points(&s, &players), [10, 10, 0, 0, 0]);
    assert_eq!(s.game.active_games(&players[2]).len(), 0);
    assert_eq!(
        s.game.try_submit_number(&1, &players[2], &sealed(&env, 2)),
        Err(Ok(Error::Eliminated))
    );

    // Then both go silent and time out together.
    for _ in 0..5 {
        play_round(&env, &s, &players, [false; 5], [0, 0, 0, 0, 0]);
    }

    assert_eq!(points(&s, &players), [0; 5]);
    let game = s.game.get_game(&1);
    assert_eq!(game.status, GameStatus::Concluded);
    assert_eq!(game.winner, None);
    assert_eq!(balance(&env, &s.token, &s.game_id), STAKE * 5);
    assert_eq!(s.treasury.fees_received(&shared::GAME_FEE_PURPOSE), 0);
}

fn event_count_for_contract(env: &Env, contract: &Address) -> usize {
    env.events()
        .all()
        .filter_by_contract(contract)
        .events()
        .len()
}
