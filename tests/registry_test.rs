//! Registry and idle-close scheduler properties, driven on tokio's paused
//! clock so the grace-period sleeps advance deterministically.

use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use wordfriends_server::game::{GameParameters, PlayerAction, SessionId};
use wordfriends_server::registry::{RegistryError, SessionRegistry};
use wordfriends_server::ws::PlayerSender;

const TIMEOUT: Duration = Duration::from_secs(60);

fn registry() -> SessionRegistry {
    SessionRegistry::new(TIMEOUT)
}

fn player_channel() -> (PlayerSender, UnboundedReceiver<Message>) {
    mpsc::unbounded_channel()
}

fn unknown_session_id() -> SessionId {
    SessionId::parse(&uuid::Uuid::new_v4().to_string()).unwrap()
}

/// Pull the next text frame off a player's channel as JSON.
fn next_json(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    match rx.try_recv().expect("expected a pending message") {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn create_and_contains() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());

    assert!(registry.contains(&info.id));
    assert_eq!(registry.session_count(), 1);
    assert!(!registry.contains(&unknown_session_id()));
    assert_eq!(
        registry.parameters(&info.id).unwrap(),
        GameParameters::default()
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_session_always_fails_and_never_mutates() {
    let registry = registry();
    registry.create_session(GameParameters::default());
    let ghost = unknown_session_id();

    let (tx, _rx) = player_channel();
    assert_eq!(
        registry.add_player(&ghost, tx).unwrap_err(),
        RegistryError::SessionNotFound
    );

    let real = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let joined = registry.add_player(&real.id, tx).unwrap();

    assert_eq!(
        registry.remove_player(&ghost, &joined.player_id).unwrap_err(),
        RegistryError::SessionNotFound
    );
    assert_eq!(
        registry
            .queue_action(
                &ghost,
                &joined.player_id,
                PlayerAction::SetCurrentWord { letters: vec![] },
            )
            .unwrap_err(),
        RegistryError::SessionNotFound
    );
    assert_eq!(
        registry.parameters(&ghost).unwrap_err(),
        RegistryError::SessionNotFound
    );

    assert_eq!(registry.session_count(), 2);
    assert!(!registry.has_pending_close(&ghost));
}

#[tokio::test(start_paused = true)]
async fn unknown_player_fails_without_arming_timer() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let joined = registry.add_player(&info.id, tx).unwrap();

    // A player id from a different session is not a member here.
    let other = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let stranger = registry.add_player(&other.id, tx).unwrap();

    assert_eq!(
        registry.remove_player(&info.id, &stranger.player_id).unwrap_err(),
        RegistryError::PlayerNotFound
    );
    assert_eq!(
        registry
            .queue_action(
                &info.id,
                &stranger.player_id,
                PlayerAction::SubmitGuess {
                    letters: vec!["c".into(), "r".into(), "a".into(), "n".into(), "e".into()],
                },
            )
            .unwrap_err(),
        RegistryError::PlayerNotFound
    );

    assert!(!registry.has_pending_close(&info.id));
    let _keep = joined;
}

#[tokio::test(start_paused = true)]
async fn removing_last_player_arms_timer_and_session_expires() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let joined = registry.add_player(&info.id, tx).unwrap();

    assert!(!registry.has_pending_close(&info.id));
    registry.remove_player(&info.id, &joined.player_id).unwrap();
    assert!(registry.has_pending_close(&info.id));

    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    assert!(!registry.contains(&info.id));
    let (tx, _rx) = player_channel();
    assert_eq!(
        registry.add_player(&info.id, tx).unwrap_err(),
        RegistryError::SessionNotFound
    );
}

#[tokio::test(start_paused = true)]
async fn join_before_deadline_cancels_close() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();
    registry.remove_player(&info.id, &p1.player_id).unwrap();

    tokio::time::sleep(TIMEOUT - Duration::from_secs(1)).await;

    let (tx, _rx2) = player_channel();
    let p2 = registry.add_player(&info.id, tx).unwrap();
    assert!(!registry.has_pending_close(&info.id));

    // Ride well past the original deadline: the session must survive.
    tokio::time::sleep(10 * TIMEOUT).await;
    assert!(registry.contains(&info.id));
    let _keep = p2;
}

#[tokio::test(start_paused = true)]
async fn remark_resets_the_deadline() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());

    // First empty transition.
    let (tx, _rx) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();
    registry.remove_player(&info.id, &p1.player_id).unwrap();

    // Second empty transition halfway through restarts the clock.
    tokio::time::sleep(TIMEOUT / 2).await;
    let (tx, _rx) = player_channel();
    let p2 = registry.add_player(&info.id, tx).unwrap();
    registry.remove_player(&info.id, &p2.player_id).unwrap();

    // The first deadline passes; the session must still be there.
    tokio::time::sleep(TIMEOUT - Duration::from_secs(1)).await;
    assert!(registry.contains(&info.id));

    // The restarted deadline passes; now it is gone.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!registry.contains(&info.id));
}

#[tokio::test(start_paused = true)]
async fn session_with_remaining_players_is_never_closed() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx1) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();
    let (tx, _rx2) = player_channel();
    let p2 = registry.add_player(&info.id, tx).unwrap();

    registry.remove_player(&info.id, &p1.player_id).unwrap();
    assert!(!registry.has_pending_close(&info.id));

    tokio::time::sleep(10 * TIMEOUT).await;
    assert!(registry.contains(&info.id));

    registry.remove_player(&info.id, &p2.player_id).unwrap();
    assert!(registry.has_pending_close(&info.id));

    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;
    assert!(!registry.contains(&info.id));
}

#[tokio::test(start_paused = true)]
async fn concurrent_joins_against_firing_timer_are_all_or_nothing() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();
    registry.remove_player(&info.id, &p1.player_id).unwrap();

    // Eight joins scheduled to wake exactly when the timer fires.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let id = info.id;
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(TIMEOUT).await;
            let (tx, _rx) = mpsc::unbounded_channel();
            registry.add_player(&id, tx).map(|j| j.player_id)
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err, RegistryError::SessionNotFound),
        }
    }

    // Either the first join cancelled the timer and every join landed, or
    // the removal committed first and every join saw SessionNotFound.
    if registry.contains(&info.id) {
        assert_eq!(successes, 8);
    } else {
        assert_eq!(successes, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn actions_are_fanned_out_in_submission_order() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, mut rx1) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();

    // Greeting is pushed by the ws actor, not the registry, so the first
    // frames on p1's channel are the two guesses, in order.
    let first: Vec<String> = ["c", "r", "a", "n", "e"].iter().map(|s| s.to_string()).collect();
    let second: Vec<String> = ["s", "l", "a", "t", "e"].iter().map(|s| s.to_string()).collect();

    registry
        .queue_action(
            &info.id,
            &p1.player_id,
            PlayerAction::SubmitGuess { letters: first.clone() },
        )
        .unwrap();
    registry
        .queue_action(
            &info.id,
            &p1.player_id,
            PlayerAction::SubmitGuess { letters: second.clone() },
        )
        .unwrap();

    let msg = next_json(&mut rx1);
    assert_eq!(msg["type"], "guess_submitted");
    assert_eq!(msg["letters"][0], "c");

    let msg = next_json(&mut rx1);
    assert_eq!(msg["type"], "guess_submitted");
    assert_eq!(msg["letters"][0], "s");
}

#[tokio::test(start_paused = true)]
async fn wrong_length_guess_is_rejected() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());
    let (tx, _rx) = player_channel();
    let p1 = registry.add_player(&info.id, tx).unwrap();

    let err = registry
        .queue_action(
            &info.id,
            &p1.player_id,
            PlayerAction::SubmitGuess {
                letters: vec!["c".into(), "a".into(), "t".into()],
            },
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidAction(_)));
}

#[tokio::test(start_paused = true)]
async fn repeated_mark_cancel_cycles_do_not_leak_or_misfire() {
    let registry = registry();
    let info = registry.create_session(GameParameters::default());

    // Churn join/leave cycles; each leave re-arms, each join cancels.
    for _ in 0..20 {
        let (tx, _rx) = player_channel();
        let joined = registry.add_player(&info.id, tx).unwrap();
        assert!(!registry.has_pending_close(&info.id));
        registry.remove_player(&info.id, &joined.player_id).unwrap();
        assert!(registry.has_pending_close(&info.id));
    }

    // Only the last timer counts: one deadline, one removal.
    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;
    assert!(!registry.contains(&info.id));
    assert_eq!(registry.session_count(), 0);
}
