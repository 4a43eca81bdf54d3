use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use crowdmoku::board::CellPos;
use crowdmoku::config::{ResetPolicy, ServerConfig};
use crowdmoku::protocol::{ClientMessage, GameStateView, ServerMessage};
use crowdmoku::state::{AppState, ConnHandle};
use crowdmoku::types::{RoundStatus, Side};
use crowdmoku::ws::handlers::handle_message;

fn connect(state: &AppState) -> (ConnHandle, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ConnHandle::new(state.next_conn_id(), tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            messages.push(serde_json::from_str(&text).expect("server frames should be valid JSON"));
        }
    }
    messages
}

fn last_view(messages: &[ServerMessage]) -> &GameStateView {
    messages
        .iter()
        .rev()
        .find_map(|msg| match msg {
            ServerMessage::GameStateUpdate(view) => Some(view),
            _ => None,
        })
        .expect("expected at least one state update")
}

async fn join_host(state: &Arc<AppState>) -> (ConnHandle, mpsc::UnboundedReceiver<Message>) {
    let (conn, rx) = connect(state);
    handle_message(state, &conn, ClientMessage::HostJoin).await;
    (conn, rx)
}

async fn join_audience(
    state: &Arc<AppState>,
    client_id: &str,
    nickname: &str,
) -> (ConnHandle, mpsc::UnboundedReceiver<Message>) {
    let (conn, rx) = connect(state);
    handle_message(
        state,
        &conn,
        ClientMessage::AudienceJoin {
            client_id: Some(client_id.to_string()),
            nickname: Some(nickname.to_string()),
        },
    )
    .await;
    (conn, rx)
}

async fn place(state: &Arc<AppState>, host: &ConnHandle, row: usize, col: usize) {
    handle_message(state, host, ClientMessage::PlaceStone { row, col }).await;
}

async fn vote(state: &Arc<AppState>, conn: &ConnHandle, client_id: &str, row: usize, col: usize) {
    handle_message(
        state,
        conn,
        ClientMessage::Vote {
            row,
            col,
            client_id: client_id.to_string(),
        },
    )
    .await;
}

/// Resolve the current voting round directly instead of waiting out the
/// countdown.
async fn force_resolve(state: &Arc<AppState>) {
    let mut room = state.room.lock().await;
    room.resolve_round(&state.config);
}

/// End-to-end flow for one voting round, including the first-vote tie-break.
#[tokio::test]
async fn test_full_round_with_tie_break() {
    let state = Arc::new(AppState::default());

    // 1. Host joins and gets a game
    let (host, mut host_rx) = join_host(&state).await;
    let messages = drain(&mut host_rx);
    let ServerMessage::GameCreated { game_id } = &messages[0] else {
        panic!("Expected GameCreated, got {:?}", messages[0]);
    };
    assert_eq!(game_id.len(), 6);
    assert_eq!(last_view(&messages).status, RoundStatus::HostTurn);

    // 2. Two audience members join
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    let (a2, mut a2_rx) = join_audience(&state, "a2", "bob").await;
    let a1_messages = drain(&mut a1_rx);
    assert!(matches!(
        &a1_messages[0],
        ServerMessage::ClientRegistered { client_id, nickname }
            if client_id == "a1" && nickname == "ada"
    ));
    drain(&mut a2_rx);

    // 3. Host places a stone, opening the vote
    place(&state, &host, 7, 7).await;
    let view = drain(&mut a1_rx);
    let view = last_view(&view);
    assert_eq!(view.status, RoundStatus::Voting);
    assert_eq!(view.board.cell(CellPos::new(7, 7)), Some(Side::Host));
    assert_eq!(view.timer, state.config.vote_seconds);

    // 4. Votes tie 1:1; (7,8) was voted first
    vote(&state, &a1, "a1", 7, 8).await;
    vote(&state, &a2, "a2", 7, 9).await;
    let view = drain(&mut a2_rx);
    let view = last_view(&view);
    assert_eq!(view.votes.get("7,8"), Some(&1));
    assert_eq!(view.votes.get("7,9"), Some(&1));

    // 5. Resolution picks the first-voted position
    force_resolve(&state).await;
    let messages = drain(&mut host_rx);
    let view = last_view(&messages);
    assert_eq!(view.status, RoundStatus::HostTurn);
    assert_eq!(view.board.cell(CellPos::new(7, 8)), Some(Side::Audience));
    assert_eq!(view.board.cell(CellPos::new(7, 9)), None);
    assert_eq!(view.current_round, 1);
    assert!(view.votes.is_empty());

    // 6. Stats recorded one match for ada, one mismatch for bob
    let room = state.room.lock().await;
    let ada = room.stats.personal("a1").unwrap();
    assert_eq!((ada.matches, ada.mismatches), (1, 0));
    let bob = room.stats.personal("a2").unwrap();
    assert_eq!((bob.matches, bob.mismatches), (0, 1));
}

/// A client's second vote in the same round is ignored silently.
#[tokio::test]
async fn test_second_vote_is_ignored() {
    let state = Arc::new(AppState::default());
    let (host, _host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    place(&state, &host, 7, 7).await;
    drain(&mut a1_rx);

    vote(&state, &a1, "a1", 7, 8).await;
    assert_eq!(drain(&mut a1_rx).len(), 1);

    // Second vote: no broadcast, no new count
    vote(&state, &a1, "a1", 6, 6).await;
    assert!(drain(&mut a1_rx).is_empty());
    let room = state.room.lock().await;
    assert_eq!(room.tally.counts().get(&CellPos::new(7, 8)), Some(&1));
    assert_eq!(room.tally.counts().get(&CellPos::new(6, 6)), None);
}

/// Votes for occupied cells are dropped, and the client may vote again.
#[tokio::test]
async fn test_vote_on_occupied_cell_is_dropped() {
    let state = Arc::new(AppState::default());
    let (host, _host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    place(&state, &host, 7, 7).await;
    drain(&mut a1_rx);

    vote(&state, &a1, "a1", 7, 7).await;
    assert!(drain(&mut a1_rx).is_empty());
    assert!(state.room.lock().await.tally.counts().is_empty());

    // The rejected vote did not use up the client's ballot
    vote(&state, &a1, "a1", 7, 8).await;
    assert_eq!(
        state
            .room
            .lock()
            .await
            .tally
            .counts()
            .get(&CellPos::new(7, 8)),
        Some(&1)
    );
}

/// Multi-round game up to a host win, with final rankings and per-client
/// stats in the finished state.
#[tokio::test]
async fn test_host_win_reports_rankings_and_personal_stats() {
    let state = Arc::new(AppState::default());
    let (host, mut host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    let (a2, mut a2_rx) = join_audience(&state, "a2", "bob").await;

    // Round 0: tie between (5,0) and (6,0); (5,0) wins as first voted
    place(&state, &host, 0, 0).await;
    vote(&state, &a1, "a1", 5, 0).await;
    vote(&state, &a2, "a2", 6, 0).await;
    force_resolve(&state).await;

    // Round 1: unanimous (5,1)
    place(&state, &host, 0, 1).await;
    vote(&state, &a1, "a1", 5, 1).await;
    vote(&state, &a2, "a2", 5, 1).await;
    force_resolve(&state).await;

    // Round 2: nobody votes, no crowd stone lands
    place(&state, &host, 0, 2).await;
    force_resolve(&state).await;

    // Round 3: only ada votes
    place(&state, &host, 0, 3).await;
    vote(&state, &a1, "a1", 5, 2).await;
    force_resolve(&state).await;

    // Round 4: the fifth stone in a row ends the game without a vote
    place(&state, &host, 0, 4).await;

    let host_messages = drain(&mut host_rx);
    let host_view = last_view(&host_messages);
    assert_eq!(host_view.status, RoundStatus::Finished);
    assert_eq!(host_view.winner, Some(Side::Host));
    assert!(host_view.my_stats.is_none());

    let top = host_view.top_players.as_ref().expect("rankings expected");
    assert_eq!(top.best.nickname, "ada");
    assert_eq!(top.best.match_rate, 100);
    assert_eq!(top.best.total_rounds, 3);
    assert_eq!(top.worst.nickname, "bob");
    assert_eq!(top.worst.match_rate, 50);

    let ada_view = drain(&mut a1_rx);
    let ada_stats = last_view(&ada_view).my_stats.as_ref().unwrap();
    assert_eq!(ada_stats.matches, 3);
    assert_eq!(ada_stats.mismatches, 0);
    assert_eq!(ada_stats.total, 3);
    assert_eq!(ada_stats.match_rate, 100);

    let bob_view = drain(&mut a2_rx);
    let bob_stats = last_view(&bob_view).my_stats.as_ref().unwrap();
    assert_eq!(bob_stats.matches, 1);
    assert_eq!(bob_stats.mismatches, 1);
    assert_eq!(bob_stats.match_rate, 50);

    // No further moves are accepted in a finished game
    place(&state, &host, 10, 10).await;
    assert!(state
        .room
        .lock()
        .await
        .game
        .board
        .is_open(CellPos::new(10, 10)));
}

/// The audience side can also win by completing five in a row.
#[tokio::test]
async fn test_audience_win_finishes_the_game() {
    let state = Arc::new(AppState::default());
    let (host, _host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;

    // Host builds a scattered line while the crowd builds row 5
    let host_moves = [(0, 0), (0, 2), (0, 4), (0, 6), (0, 8)];
    for (round, &(row, col)) in host_moves.iter().enumerate() {
        place(&state, &host, row, col).await;
        vote(&state, &a1, "a1", 5, round).await;
        force_resolve(&state).await;
    }

    let messages = drain(&mut a1_rx);
    let view = last_view(&messages);
    assert_eq!(view.status, RoundStatus::Finished);
    assert_eq!(view.winner, Some(Side::Audience));
    assert_eq!(view.board.cell(CellPos::new(5, 4)), Some(Side::Audience));
    let my_stats = view.my_stats.as_ref().unwrap();
    assert_eq!(my_stats.matches, 5);
}

/// The countdown drives resolution on its own once the votes are in.
#[tokio::test(start_paused = true)]
async fn test_countdown_resolves_the_round() {
    let config = ServerConfig {
        vote_seconds: 3,
        ..Default::default()
    };
    let state = Arc::new(AppState::new(config));
    let (host, _host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;

    place(&state, &host, 7, 7).await;
    vote(&state, &a1, "a1", 7, 8).await;

    tokio::time::sleep(Duration::from_millis(3500)).await;

    let messages = drain(&mut a1_rx);
    let view = last_view(&messages);
    assert_eq!(view.status, RoundStatus::HostTurn);
    assert_eq!(view.board.cell(CellPos::new(7, 8)), Some(Side::Audience));
    assert_eq!(view.current_round, 1);

    // Ticks in between were broadcast with a falling timer
    let timers: Vec<u32> = messages
        .iter()
        .filter_map(|msg| match msg {
            ServerMessage::GameStateUpdate(view) => Some(view.timer),
            _ => None,
        })
        .collect();
    assert!(timers.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(*timers.last().unwrap(), 0);
}

/// Host disconnect tears the whole game down.
#[tokio::test]
async fn test_host_disconnect_closes_audience() {
    let state = Arc::new(AppState::default());
    let (host, _host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    place(&state, &host, 7, 7).await;
    vote(&state, &a1, "a1", 7, 8).await;
    drain(&mut a1_rx);

    state.handle_disconnect(host.conn_id).await;

    // The audience socket is asked to close and the roster empties
    let closed = std::iter::from_fn(|| a1_rx.try_recv().ok())
        .any(|msg| matches!(msg, Message::Close(None)));
    assert!(closed);
    let room = state.room.lock().await;
    assert_eq!(room.registry.audience_len(), 0);
    assert!(room.registry.host().is_none());
    assert_eq!(room.game.status, RoundStatus::Ready);
    drop(room);

    // A new host starts a fresh game on the same server
    let (_host2, mut host2_rx) = join_host(&state).await;
    let messages = drain(&mut host2_rx);
    assert!(matches!(&messages[0], ServerMessage::GameCreated { .. }));
    let view = last_view(&messages);
    assert_eq!(view.status, RoundStatus::HostTurn);
    assert!(view.board.cell(CellPos::new(7, 7)).is_none());
}

/// An audience disconnect only drops that member; their stats survive for
/// a rejoin under the same client id.
#[tokio::test]
async fn test_audience_rejoin_recovers_stats() {
    let state = Arc::new(AppState::default());
    let (host, _host_rx) = join_host(&state).await;
    let (a1, _a1_rx) = join_audience(&state, "a1", "ada").await;

    place(&state, &host, 7, 7).await;
    vote(&state, &a1, "a1", 7, 8).await;
    force_resolve(&state).await;

    state.handle_disconnect(a1.conn_id).await;
    assert_eq!(state.room.lock().await.registry.audience_len(), 0);

    let (_a1_again, mut rx) = join_audience(&state, "a1", "ada").await;
    let messages = drain(&mut rx);
    assert!(matches!(
        &messages[0],
        ServerMessage::ClientRegistered { client_id, .. } if client_id == "a1"
    ));
    let room = state.room.lock().await;
    assert_eq!(room.stats.personal("a1").unwrap().matches, 1);
}

/// Reset under the default policy keeps the audience connected with fresh
/// stats.
#[tokio::test]
async fn test_reset_keeps_audience_with_zeroed_stats() {
    let state = Arc::new(AppState::default());
    let (host, mut host_rx) = join_host(&state).await;
    let (a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    let first_game_id = state.room.lock().await.game.game_id.clone();

    place(&state, &host, 7, 7).await;
    vote(&state, &a1, "a1", 7, 8).await;
    force_resolve(&state).await;
    assert_eq!(state.room.lock().await.stats.personal("a1").unwrap().total, 1);
    drain(&mut host_rx);
    drain(&mut a1_rx);

    handle_message(&state, &host, ClientMessage::ResetGame).await;

    let host_messages = drain(&mut host_rx);
    let ServerMessage::GameCreated { game_id } = &host_messages[0] else {
        panic!("Expected GameCreated, got {:?}", host_messages[0]);
    };
    assert_ne!(game_id, &first_game_id);

    let a1_messages = drain(&mut a1_rx);
    let view = last_view(&a1_messages);
    assert_eq!(view.status, RoundStatus::HostTurn);
    assert!(view.board.cell(CellPos::new(7, 7)).is_none());

    let room = state.room.lock().await;
    assert_eq!(room.registry.audience_len(), 1);
    assert_eq!(room.stats.personal("a1").unwrap().total, 0);
}

/// Reset under the clear policy closes and forgets the audience.
#[tokio::test]
async fn test_reset_clear_policy_disconnects_audience() {
    let config = ServerConfig {
        reset_policy: ResetPolicy::ClearAudience,
        ..Default::default()
    };
    let state = Arc::new(AppState::new(config));
    let (host, _host_rx) = join_host(&state).await;
    let (_a1, mut a1_rx) = join_audience(&state, "a1", "ada").await;
    drain(&mut a1_rx);

    handle_message(&state, &host, ClientMessage::ResetGame).await;

    let closed = std::iter::from_fn(|| a1_rx.try_recv().ok())
        .any(|msg| matches!(msg, Message::Close(None)));
    assert!(closed);
    let room = state.room.lock().await;
    assert_eq!(room.registry.audience_len(), 0);
    assert!(room.stats.is_empty());
}

/// A second HOST_JOIN displaces the previous host connection.
#[tokio::test]
async fn test_new_host_displaces_old_one() {
    let state = Arc::new(AppState::default());
    let (old_host, _old_rx) = join_host(&state).await;
    let (new_host, _new_rx) = join_host(&state).await;

    // The old connection can no longer act as host
    place(&state, &old_host, 7, 7).await;
    assert!(state
        .room
        .lock()
        .await
        .game
        .board
        .is_open(CellPos::new(7, 7)));

    place(&state, &new_host, 7, 7).await;
    assert_eq!(
        state.room.lock().await.game.board.cell(CellPos::new(7, 7)),
        Some(Side::Host)
    );

    // The old socket closing must not tear down the new host's game
    state.handle_disconnect(old_host.conn_id).await;
    let room = state.room.lock().await;
    assert!(room.registry.is_host(new_host.conn_id));
    assert_eq!(room.game.status, RoundStatus::Voting);
}
