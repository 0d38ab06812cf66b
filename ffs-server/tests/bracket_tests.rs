//! Integration tests for the bracket engine
//!
//! Tests cover:
//! - Tournament sizes 1, 2, 3 and 5 played to completion
//! - Bracket properties for every size up to 17
//! - Replayed, stale and concurrent decisions
//! - Start, abandon, resume and the incomplete listing
//! - Winner and playlist statistics

use std::collections::{HashMap, HashSet};

use ffs_common::db::{init_database, Playlist, PlaylistItem};
use ffs_server::bracket::{store, Outcome};
use ffs_server::db::{matches, tournaments, users};
use ffs_server::{Bracket, Error};
use sqlx::SqlitePool;
use tempfile::TempDir;

const USER: &str = "listener";

async fn setup() -> (TempDir, SqlitePool, Bracket) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("ffs.db")).await.unwrap();
    let bracket = Bracket::new(pool.clone());
    (dir, pool, bracket)
}

fn playlist(id: &str) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: Some(format!("Playlist {}", id)),
        url: Some(format!("https://music.example/playlists/{}", id)),
    }
}

fn items(n: usize) -> Vec<PlaylistItem> {
    (0..n)
        .map(|i| PlaylistItem {
            id: format!("song-{:02}", i),
            title: Some(format!("Song {}", i)),
            artists: Some("Someone".to_string()),
            image: None,
        })
        .collect()
}

fn ceil_log2(n: usize) -> i64 {
    let mut rounds = 0;
    while (1usize << rounds) < n {
        rounds += 1;
    }
    rounds
}

fn expect_pair(outcome: Outcome) -> (i64, i64, PlaylistItem, PlaylistItem) {
    match outcome {
        Outcome::Pair {
            round,
            matches,
            items: [a, b],
        } => (round, matches, a, b),
        other => panic!("expected pair, got {:?}", other),
    }
}

fn expect_winner(outcome: Outcome) -> PlaylistItem {
    match outcome {
        Outcome::Winner { winner } => winner,
        other => panic!("expected winner, got {:?}", other),
    }
}

/// Play to the end, first item of each pair winning, checking the per-step
/// properties along the way. Returns the winner.
async fn play_out(pool: &SqlitePool, bracket: &Bracket, tournament_id: i64) -> PlaylistItem {
    let mut conn = pool.acquire().await.unwrap();
    let mut played: HashMap<i64, HashSet<String>> = HashMap::new();
    let mut last_round = 0;
    let mut lost: HashSet<String> = HashSet::new();

    let mut outcome = bracket.poll_next_pair(tournament_id).await.unwrap();
    for _ in 0..64 {
        let (round, _, a, b) = match outcome {
            Outcome::Winner { winner } => return winner,
            pair => expect_pair(pair),
        };

        assert!(round >= last_round, "round went back from {} to {}", last_round, round);
        last_round = round;

        let in_round = played.entry(round).or_default();
        assert!(in_round.insert(a.id.clone()), "{} played twice in round {}", a.id, round);
        assert!(in_round.insert(b.id.clone()), "{} played twice in round {}", b.id, round);

        outcome = bracket
            .submit_decision(tournament_id, &a.id, &b.id, Some(round))
            .await
            .unwrap();

        let now_lost: HashSet<String> = store::candidates(&mut conn, tournament_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.lost)
            .map(|c| c.item_id)
            .collect();
        if !now_lost.is_empty() {
            assert!(now_lost.is_superset(&lost), "an eliminated item came back");
            lost = now_lost;
        }
    }
    panic!("tournament {} did not finish", tournament_id);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_single_item_wins_immediately() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(1))
        .await
        .unwrap();

    let winner = expect_winner(bracket.poll_next_pair(tournament_id).await.unwrap());
    assert_eq!(winner.id, "song-00");

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_two_items_one_decision() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(2))
        .await
        .unwrap();

    let (round, done, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    assert_eq!((round, done), (0, 0));

    let winner = expect_winner(
        bracket
            .submit_decision(tournament_id, &b.id, &a.id, None)
            .await
            .unwrap(),
    );
    assert_eq!(winner.id, b.id);

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 1);

    let tournament = tournaments::get_tournament(&mut conn, tournament_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tournament.current_round, 0);
    assert_eq!(tournament.winner.as_deref(), Some(b.id.as_str()));

    assert!(matches!(
        bracket.active_tournament(USER).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_three_items_bye_carried_forward() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(3))
        .await
        .unwrap();

    let (round, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    assert_eq!(round, 0);
    let bye = items(3)
        .into_iter()
        .find(|item| item.id != a.id && item.id != b.id)
        .unwrap();

    let (round, done, c, d) = expect_pair(
        bracket
            .submit_decision(tournament_id, &a.id, &b.id, Some(0))
            .await
            .unwrap(),
    );
    assert_eq!((round, done), (1, 0));
    let mut finalists = vec![c.id.clone(), d.id.clone()];
    finalists.sort();
    let mut expected = vec![a.id.clone(), bye.id.clone()];
    expected.sort();
    assert_eq!(finalists, expected);

    let winner = expect_winner(
        bracket
            .submit_decision(tournament_id, &bye.id, &a.id, Some(1))
            .await
            .unwrap(),
    );
    assert_eq!(winner.id, bye.id);

    let mut conn = pool.acquire().await.unwrap();
    let rows = matches::matches_for_tournament(&mut conn, tournament_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].round_number, 0);
    assert_eq!(rows[1].round_number, 1);
}

#[tokio::test]
async fn test_five_items_three_rounds() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(5))
        .await
        .unwrap();

    play_out(&pool, &bracket, tournament_id).await;

    let mut conn = pool.acquire().await.unwrap();
    let rows = matches::matches_for_tournament(&mut conn, tournament_id).await.unwrap();
    assert_eq!(rows.len(), 4);
    let rounds: HashSet<i64> = rows.iter().map(|m| m.round_number).collect();
    assert_eq!(rounds, HashSet::from([0, 1, 2]));
}

#[tokio::test]
async fn test_bracket_properties_for_sizes_up_to_17() {
    for n in 1..=17 {
        let (_dir, pool, bracket) = setup().await;
        let originals: HashSet<String> = items(n).into_iter().map(|i| i.id).collect();
        let tournament_id = bracket
            .start_tournament(USER, playlist("p1"), items(n))
            .await
            .unwrap();

        let winner = play_out(&pool, &bracket, tournament_id).await;
        assert!(originals.contains(&winner.id), "n={}: winner not from the playlist", n);

        let mut conn = pool.acquire().await.unwrap();
        let rows = matches::matches_for_tournament(&mut conn, tournament_id).await.unwrap();
        assert_eq!(rows.len(), n - 1, "n={}: match count", n);

        let rounds: HashSet<i64> = rows.iter().map(|m| m.round_number).collect();
        assert!(
            rounds.len() as i64 <= ceil_log2(n),
            "n={}: {} rounds played",
            n,
            rounds.len()
        );

        let losers: HashSet<&str> = rows.iter().map(|m| m.loser.as_str()).collect();
        assert_eq!(losers.len(), n - 1, "n={}: an item lost twice", n);
        assert!(!losers.contains(winner.id.as_str()));

        // Finished: candidates gone, tournament row kept
        assert!(store::candidates(&mut conn, tournament_id).await.unwrap().is_empty());
        let tournament = tournaments::get_tournament(&mut conn, tournament_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tournament.winner.as_deref(), Some(winner.id.as_str()));
    }
}

// =============================================================================
// Rejected decisions
// =============================================================================

#[tokio::test]
async fn test_replayed_decision_conflicts() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();

    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    bracket
        .submit_decision(tournament_id, &a.id, &b.id, Some(0))
        .await
        .unwrap();

    let replay = bracket.submit_decision(tournament_id, &a.id, &b.id, Some(0)).await;
    assert!(matches!(replay, Err(Error::Conflict(_))));

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_round_argument_checked() {
    let (_dir, _pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(3))
        .await
        .unwrap();

    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    let (round, _, c, d) = expect_pair(
        bracket
            .submit_decision(tournament_id, &a.id, &b.id, Some(0))
            .await
            .unwrap(),
    );
    assert_eq!(round, 1);

    let stale = bracket.submit_decision(tournament_id, &c.id, &d.id, Some(0)).await;
    assert!(matches!(stale, Err(Error::Conflict(_))));

    let future = bracket.submit_decision(tournament_id, &c.id, &d.id, Some(2)).await;
    assert!(matches!(future, Err(Error::InvalidInput(_))));

    let negative = bracket.submit_decision(tournament_id, &c.id, &d.id, Some(-1)).await;
    assert!(matches!(negative, Err(Error::InvalidInput(_))));

    // Nothing above changed the bracket
    bracket
        .submit_decision(tournament_id, &c.id, &d.id, Some(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_ids_rejected() {
    let (_dir, _pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(2))
        .await
        .unwrap();

    let foreign = bracket
        .submit_decision(tournament_id, "song-00", "song-99", None)
        .await;
    assert!(matches!(foreign, Err(Error::InvalidInput(_))));

    let missing = bracket.submit_decision(999, "song-00", "song-01", None).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_double_submit() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();

    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());

    let (first, second) = tokio::join!(
        bracket.submit_decision(tournament_id, &a.id, &b.id, Some(0)),
        bracket.submit_decision(tournament_id, &a.id, &b.id, Some(0)),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::Conflict(_)))));

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 1);
    let loser = store::get_candidate(&mut conn, tournament_id, &b.id)
        .await
        .unwrap()
        .unwrap();
    assert!(loser.lost);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_final_decision() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(2))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        bracket.submit_decision(tournament_id, "song-00", "song-01", None),
        bracket.submit_decision(tournament_id, "song-00", "song-01", None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::Conflict(_)))));

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_matches_completed_in_round() {
    let (_dir, _pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();

    assert_eq!(bracket.matches_completed_in_round(tournament_id, 0).await.unwrap(), 0);

    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    let (round, done, _, _) = expect_pair(
        bracket
            .submit_decision(tournament_id, &a.id, &b.id, None)
            .await
            .unwrap(),
    );
    assert_eq!((round, done), (0, 1));
    assert_eq!(bracket.matches_completed_in_round(tournament_id, 0).await.unwrap(), 1);
    assert_eq!(bracket.matches_completed_in_round(tournament_id, 1).await.unwrap(), 0);

    assert!(matches!(
        bracket.matches_completed_in_round(tournament_id, -1).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        bracket.matches_completed_in_round(999, 0).await,
        Err(Error::NotFound(_))
    ));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_rejects_second_active_and_empty_playlist() {
    let (_dir, _pool, bracket) = setup().await;

    let empty = bracket.start_tournament(USER, playlist("p1"), Vec::new()).await;
    assert!(matches!(empty, Err(Error::InvalidInput(_))));

    let first = bracket
        .start_tournament(USER, playlist("p1"), items(3))
        .await
        .unwrap();
    let second = bracket.start_tournament(USER, playlist("p2"), items(3)).await;
    assert!(matches!(second, Err(Error::Conflict(_))));

    assert_eq!(bracket.active_tournament(USER).await.unwrap().id, first);
}

#[tokio::test]
async fn test_start_collapses_duplicate_items() {
    let (_dir, pool, bracket) = setup().await;
    let mut doubled = items(3);
    doubled.extend(items(2));

    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), doubled)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(store::candidates(&mut conn, tournament_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_abandon_removes_everything() {
    let (_dir, pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();
    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(tournament_id).await.unwrap());
    bracket
        .submit_decision(tournament_id, &a.id, &b.id, None)
        .await
        .unwrap();

    bracket.abandon_tournament(tournament_id).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(tournaments::get_tournament(&mut conn, tournament_id)
        .await
        .unwrap()
        .is_none());
    assert!(store::candidates(&mut conn, tournament_id).await.unwrap().is_empty());
    assert_eq!(matches::count_for_tournament(&mut conn, tournament_id).await.unwrap(), 0);
    let user = users::get_user(&mut conn, USER).await.unwrap().unwrap();
    assert_eq!(user.current_tournament, None);

    assert!(matches!(
        bracket.abandon_tournament(tournament_id).await,
        Err(Error::NotFound(_))
    ));

    // The user can start over
    bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_abandon_finished_tournament_conflicts() {
    let (_dir, _pool, bracket) = setup().await;
    let tournament_id = bracket
        .start_tournament(USER, playlist("p1"), items(1))
        .await
        .unwrap();
    expect_winner(bracket.poll_next_pair(tournament_id).await.unwrap());

    assert!(matches!(
        bracket.abandon_tournament(tournament_id).await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        bracket.submit_decision(tournament_id, "song-00", "song-01", None).await,
        Err(Error::Conflict(_))
    ));
}

#[tokio::test]
async fn test_incomplete_listing_and_resume() {
    let (_dir, pool, bracket) = setup().await;

    let parked = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();
    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(parked).await.unwrap());
    bracket.submit_decision(parked, &a.id, &b.id, None).await.unwrap();

    // The session layer drops the pointer when the user walks away
    {
        let mut conn = pool.acquire().await.unwrap();
        users::set_current_tournament(&mut conn, USER, None).await.unwrap();
    }

    let current = bracket
        .start_tournament(USER, playlist("p2"), items(2))
        .await
        .unwrap();

    let listing = bracket.incomplete_tournaments(USER).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, parked);
    assert_eq!(listing[0].playlist_name.as_deref(), Some("Playlist p1"));
    assert_eq!(listing[0].matches_completed, 1);

    assert!(matches!(
        bracket.resume_tournament(USER, parked).await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        bracket.resume_tournament("someone-else", parked).await,
        Err(Error::NotFound(_))
    ));

    bracket.abandon_tournament(current).await.unwrap();
    let resumed = bracket.resume_tournament(USER, parked).await.unwrap();
    assert_eq!(resumed.id, parked);
    assert_eq!(bracket.active_tournament(USER).await.unwrap().id, parked);
    assert!(bracket.incomplete_tournaments(USER).await.unwrap().is_empty());

    // Resuming the active tournament again is a no-op
    bracket.resume_tournament(USER, parked).await.unwrap();
}

// =============================================================================
// Statistics
// =============================================================================

#[tokio::test]
async fn test_statistics_over_finished_tournaments() {
    let (_dir, pool, bracket) = setup().await;

    let mut winners = Vec::new();
    for _ in 0..2 {
        let tournament_id = bracket
            .start_tournament(USER, playlist("p1"), items(4))
            .await
            .unwrap();
        winners.push(play_out(&pool, &bracket, tournament_id).await.id);
    }

    // An unfinished tournament does not count
    let open = bracket
        .start_tournament(USER, playlist("p1"), items(4))
        .await
        .unwrap();
    let (_, _, a, b) = expect_pair(bracket.poll_next_pair(open).await.unwrap());
    bracket.submit_decision(open, &a.id, &b.id, None).await.unwrap();

    let counts = bracket.winner_counts(USER).await.unwrap();
    assert_eq!(counts.iter().map(|c| c.wins).sum::<i64>(), 2);
    for winner in &winners {
        assert!(counts.iter().any(|c| &c.id == winner));
    }
    assert!(counts.windows(2).all(|w| w[0].wins >= w[1].wins));

    let points = bracket.playlist_statistics(USER, "p1").await.unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points.iter().map(|p| p.points).sum::<i64>(), 6);
    assert!(points.windows(2).all(|w| w[0].points <= w[1].points));

    assert!(bracket.winner_counts("nobody").await.unwrap().is_empty());
    assert!(matches!(
        bracket.playlist_statistics(USER, "missing").await,
        Err(Error::NotFound(_))
    ));
}
