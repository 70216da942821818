use axum::{
  extract::ws::{Message, WebSocket},
  extract::{Path, State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod game;
mod protocol;
mod shared;

use game::arena::Arena;

#[derive(Clone)]
struct AppState {
  arenas: DashMap<String, Arc<Arena>>,
}

#[derive(Debug, Serialize)]
struct OkResponse {
  ok: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let state = Arc::new(AppState {
    arenas: DashMap::new(),
  });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET])
    .allow_headers(Any);

  let app: Router = Router::new()
    .route("/api/health", get(health))
    .route("/api/arena/:arena", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let port: u16 = env::var("PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(9090);

  let address = format!("0.0.0.0:{port}");
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

impl AppState {
  fn arena(&self, name: String) -> Arc<Arena> {
    match self.arenas.entry(name) {
      dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
      dashmap::mapref::entry::Entry::Vacant(entry) => {
        let arena = Arc::new(Arena::new());
        entry.insert(arena.clone());
        arena
      }
    }
  }
}

async fn health() -> impl IntoResponse {
  Json(OkResponse { ok: true })
}

async fn ws_handler(
  ws: WebSocketUpgrade,
  Path(arena): Path<String>,
  State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
  let trimmed = arena.trim();
  let name = if trimmed.is_empty() { "main" } else { trimmed }.to_string();
  let arena = state.arena(name);
  ws.on_upgrade(move |socket| handle_socket(socket, arena))
}

async fn handle_socket(socket: WebSocket, arena: Arc<Arena>) {
  let (mut sender, mut receiver) = socket.split();
  let (tx, mut rx) = mpsc::unbounded_channel::<String>();
  let session_id = arena.add_session(tx).await;

  let send_task = tokio::spawn(async move {
    while let Some(payload) = rx.recv().await {
      if sender.send(Message::Text(payload)).await.is_err() {
        break;
      }
    }
  });

  while let Some(result) = receiver.next().await {
    let Ok(message) = result else { break };
    match message {
      Message::Text(text) => {
        arena.handle_text_message(&session_id, &text).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }

  arena.remove_session(&session_id).await;
  send_task.abort();
}
