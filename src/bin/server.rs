use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use maze_chase_engine::audio::{AudioSink, CueThrottle};
use maze_chase_engine::autopilot::Autopilot;
use maze_chase_engine::constants::TICK_MS;
use maze_chase_engine::engine::{EngineConfig, GameEngine};
use maze_chase_engine::error::{EngineError, LevelError};
use maze_chase_engine::grid::Grid;
use maze_chase_engine::level::{builtin_level, load_level, LevelConfig};
use maze_chase_engine::pathfinding::find_path;
use maze_chase_engine::server_protocol::{parse_client_message, ParsedClientMessage};
use maze_chase_engine::server_utils::{normalize_block, parse_port, parse_tile_query, tile_in_grid};
use maze_chase_engine::types::{EngineStatus, SoundCue};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// Cues played since the last broadcast frame.
#[derive(Debug, Default)]
struct PendingCues(Vec<SoundCue>);

impl AudioSink for PendingCues {
    fn play(&mut self, cue: SoundCue, _now_ms: u64) {
        self.0.push(cue);
    }
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    engine: GameEngine,
    pilot: Autopilot,
    audio: CueThrottle<PendingCues>,
    halted_logged: bool,
}

impl ServerState {
    fn new(engine: GameEngine) -> Self {
        let pilot = Autopilot::new(engine.grid(), engine.level.player_start);
        Self {
            clients: HashMap::new(),
            engine,
            pilot,
            audio: CueThrottle::new(PendingCues::default()),
            halted_logged: false,
        }
    }

    fn restart(&mut self) -> Result<(), LevelError> {
        self.engine.restart()?;
        self.pilot = Autopilot::new(self.engine.grid(), self.engine.level.player_start);
        self.halted_logged = false;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    from: Option<String>,
    to: Option<String>,
    block: Option<String>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let port = parse_port(std::env::var("PORT").ok().as_deref());

    let level = match resolve_level() {
        Ok(level) => level,
        Err(err) => {
            error!(error = %err, "level_load_failed");
            std::process::exit(1);
        }
    };
    let seed = std::env::var("SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());
    let config = EngineConfig {
        seed,
        ..EngineConfig::default()
    };
    let engine = match GameEngine::new(level, config) {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "engine_setup_failed");
            std::process::exit(1);
        }
    };

    let state = Arc::new(Mutex::new(ServerState::new(engine)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/level", get(level_handler))
        .route("/api/path", get(path_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        info!(root = %static_dir.display(), "serving static files");
        let index_file = static_dir.join("index.html");
        app.fallback_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)))
    } else {
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %bind_addr, error = %err, "bind_failed");
            std::process::exit(1);
        }
    };

    info!(port, seed, "listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "server_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn resolve_level() -> Result<LevelConfig, LevelError> {
    match std::env::var("LEVEL_PATH") {
        Ok(path) => load_level(path),
        Err(_) => builtin_level(),
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var("STATIC_DIR").ok()?);
    if path.is_dir() {
        Some(path)
    } else {
        warn!(root = %path.display(), "STATIC_DIR is not a directory");
        None
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn level_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.level.view())
}

async fn path_handler(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    match plan_path(guard.engine.grid(), &query) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(message) => (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))),
    }
}

fn plan_path(grid: &Grid, query: &PathQuery) -> Result<Value, String> {
    let from = tile_in_grid(grid, parse_tile_query(query.from.as_deref()))
        .ok_or_else(|| "from must be row,col inside the grid".to_string())?;
    let to = tile_in_grid(grid, parse_tile_query(query.to.as_deref()))
        .ok_or_else(|| "to must be row,col inside the grid".to_string())?;
    let block = normalize_block(query.block.as_deref());
    let path = find_path(grid, from, to, block);
    Ok(json!({
        "from": from,
        "to": to,
        "block": block,
        "reached": path.last() == Some(&to),
        "path": path,
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
        let welcome = json!({
            "type": "welcome",
            "clientId": client_id,
            "level": guard.engine.level.view(),
        });
        send_to_client(&mut guard, &client_id, &welcome, QueuePolicy::DisconnectOnFull);
        info!(client = %client_id, clients = guard.clients.len(), "client connected");
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = std::str::from_utf8(&raw) {
                    handle_client_message(&state, &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
        info!(client = %client_id, clients = guard.clients.len(), "client disconnected");
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error_to_client(state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
        ParsedClientMessage::SetMode { mode } => {
            guard.engine.force_mode(mode);
            info!(client = %client_id, mode = mode.as_str(), "mode forced");
        }
        ParsedClientMessage::Restart => {
            if let Err(err) = guard.restart() {
                error!(error = %err, "restart_failed");
                send_to_client(
                    &mut guard,
                    client_id,
                    &json!({
                        "type": "error",
                        "message": err.to_string(),
                    }),
                    QueuePolicy::DisconnectOnFull,
                );
            }
        }
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    if state.engine.status() == EngineStatus::LevelComplete {
        info!(score = state.engine.score(), "level cleared, starting over");
        if let Err(err) = state.restart() {
            error!(error = %err, "restart_failed");
            return;
        }
    }

    let input = if state.engine.is_paused() {
        state.pilot.input(state.engine.grid())
    } else {
        state.pilot.tick(state.engine.grid())
    };
    match state.engine.step(TICK_MS, &input, &mut state.audio) {
        Ok(report) => {
            if report.player_died {
                state.pilot.reset(state.engine.grid());
            }
        }
        Err(EngineError::Halted(reason)) => {
            if !state.halted_logged {
                warn!(%reason, "engine is halted; send restart to resume");
                state.halted_logged = true;
            }
        }
        Err(err) => {
            error!(error = %err, "engine step failed");
        }
    }

    let snapshot = state.engine.build_snapshot(true);
    let cues: Vec<&'static str> = state
        .audio
        .inner_mut()
        .0
        .drain(..)
        .map(|cue| cue.name())
        .collect();

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
            "player": input,
            "cues": cues,
        }),
        QueuePolicy::DropOnFull,
    );
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = state
        .clients
        .get(client_id)
        .is_some_and(|client| client.tx.try_send(message.to_string()).is_err());
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        state.clients.remove(client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    if state.clients.is_empty() {
        return;
    }
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.tx.try_send(payload.clone()).is_err() && policy == QueuePolicy::DisconnectOnFull {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        state.clients.remove(&client_id);
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_chase_engine::types::GhostMode;

    fn test_state() -> ServerState {
        let level = builtin_level().expect("level");
        let config = EngineConfig {
            seed: 9,
            ..EngineConfig::default()
        };
        ServerState::new(GameEngine::new(level, config).expect("engine"))
    }

    fn query(from: Option<&str>, to: Option<&str>, block: Option<&str>) -> PathQuery {
        PathQuery {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            block: block.map(str::to_string),
        }
    }

    #[test]
    fn tick_game_advances_engine_and_frames_reach_clients() {
        let mut state = test_state();
        let (tx, mut rx) = mpsc::channel::<String>(8);
        state
            .clients
            .insert("client_test".to_string(), ClientContext { tx });

        tick_game(&mut state);
        tick_game(&mut state);

        assert_eq!(state.engine.now_ms(), 2 * TICK_MS);
        let frame: Value = serde_json::from_str(&rx.try_recv().expect("frame")).expect("json");
        assert_eq!(frame["type"], "state");
        assert_eq!(frame["snapshot"]["tick"], 1);
        assert!(frame["cues"].is_array());
    }

    #[test]
    fn full_queue_drops_frames_without_disconnecting() {
        let mut state = test_state();
        let (tx, _rx) = mpsc::channel::<String>(1);
        state
            .clients
            .insert("client_slow".to_string(), ClientContext { tx });

        tick_game(&mut state);
        tick_game(&mut state);
        assert!(state.clients.contains_key("client_slow"));

        send_to_client(
            &mut state,
            "client_slow",
            &json!({"type": "pong"}),
            QueuePolicy::DisconnectOnFull,
        );
        assert!(!state.clients.contains_key("client_slow"));
    }

    #[test]
    fn restart_resets_engine_clock() {
        let mut state = test_state();
        for _ in 0..10 {
            tick_game(&mut state);
        }
        state.engine.force_mode(GhostMode::Chase);
        state.restart().expect("restart");
        assert_eq!(state.engine.now_ms(), 0);
        assert_eq!(state.engine.mode(), GhostMode::Scatter);
    }

    #[test]
    fn plan_path_validates_query_tiles() {
        let state = test_state();
        let grid = state.engine.grid();
        let start = state.engine.level.player_start;
        let exit = state.engine.level.den_exit;

        let from = format!("{},{}", start.row, start.col);
        let to = format!("{},{}", exit.row, exit.col);
        let body = plan_path(grid, &query(Some(&from), Some(&to), None)).expect("path");
        assert_eq!(body["reached"], true);
        assert_eq!(body["block"], 2);
        assert_eq!(body["path"][0], json!({"row": start.row, "col": start.col}));

        assert!(plan_path(grid, &query(None, Some(&to), None)).is_err());
        assert!(plan_path(grid, &query(Some("999,0"), Some(&to), None)).is_err());
    }

    #[test]
    fn make_id_is_unique() {
        assert_ne!(make_id("client"), make_id("client"));
    }
}
