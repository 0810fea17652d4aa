use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::card::{self, Flashcard};
use crate::config::ServeConfig;
use crate::review::Study;
use crate::scheduler::{Difficulty, StructuralError};

const NO_HINT: &str = "No hint available for this card.";

// -- App state --

pub type SharedState = Arc<Mutex<Study>>;

// -- Request and response bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct PracticeResponse {
    pub cards: Vec<PracticeCard>,
    pub day: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeCard {
    pub front: String,
    pub back: String,
    pub hint: Option<String>,
    pub tags: Vec<String>,
}

impl From<&Flashcard> for PracticeCard {
    fn from(card: &Flashcard) -> PracticeCard {
        PracticeCard {
            front: card.front.clone(),
            back: card.back.clone(),
            hint: card.hint.clone(),
            tags: card.tags.clone(),
        }
    }
}

// Untyped so a missing or out-of-range difficulty gets our own 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub card_front: String,
    pub card_back: String,
    #[serde(default)]
    pub difficulty: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintQuery {
    pub card_front: Option<String>,
    pub card_back: Option<String>,
}

// -- Helpers --

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn internal_error(err: StructuralError) -> Response {
    log::error!("unhandled error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error", "error": err.to_string() })),
    )
        .into_response()
}

fn parse_difficulty(value: &serde_json::Value) -> Option<Difficulty> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(Difficulty::from_u8)
}

// -- Route handlers --

async fn practice(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    let ids = match st.practice_cards() {
        Ok(ids) => ids,
        Err(e) => return internal_error(e),
    };
    let cards: Vec<PracticeCard> = ids
        .into_iter()
        .filter_map(|id| st.card(id).map(PracticeCard::from))
        .collect();

    log::info!("practice cards found: {}", cards.len());
    Json(PracticeResponse {
        cards,
        day: st.day(),
    })
    .into_response()
}

async fn update(State(state): State<SharedState>, Json(req): Json<UpdateRequest>) -> Response {
    let Some(difficulty) = parse_difficulty(&req.difficulty) else {
        return message(StatusCode::BAD_REQUEST, "Invalid difficulty");
    };

    let mut st = state.lock().await;
    let Some(id) = st.find_card(&req.card_front, &req.card_back) else {
        return message(StatusCode::NOT_FOUND, "Card not found");
    };

    if st.answer(id, difficulty, Utc::now()).is_none() {
        log::warn!("card {:?} is in no bucket; nothing recorded", req.card_front);
    }
    message(StatusCode::OK, "Card updated successfully")
}

async fn hint(State(state): State<SharedState>, Query(query): Query<HintQuery>) -> Response {
    let (Some(front), Some(back)) = (
        query.card_front.filter(|s| !s.is_empty()),
        query.card_back.filter(|s| !s.is_empty()),
    ) else {
        return message(
            StatusCode::BAD_REQUEST,
            "Missing cardFront or cardBack query parameters",
        );
    };

    let st = state.lock().await;
    let Some(card) = st.find_card(&front, &back).and_then(|id| st.card(id)) else {
        return message(StatusCode::NOT_FOUND, "Card not found");
    };

    log::info!("hint requested for card: {front}");
    let hint = match &card.hint {
        Some(_) => crate::scheduler::hint(card),
        None => NO_HINT,
    };
    Json(json!({ "hint": hint })).into_response()
}

async fn progress(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    match st.progress() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn next_day(State(state): State<SharedState>) -> Response {
    let day = state.lock().await.next_day();
    Json(json!({ "message": "Day incremented successfully", "day": day })).into_response()
}

// -- Public entry points --

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/practice", get(practice))
        .route("/api/update", post(update))
        .route("/api/hint", get(hint))
        .route("/api/progress", get(progress))
        .route("/api/day/next", post(next_day))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: ServeConfig) -> std::io::Result<()> {
    let entries = if config.paths.is_empty() {
        log::info!("no deck paths given, using the sample deck");
        card::sample_deck()
    } else {
        let files = card::discover_files(&config.paths);
        let entries: Vec<_> = card::load_decks(&files)
            .into_iter()
            .map(|(entry, _)| entry)
            .collect();
        log::info!("loaded {} cards from {} files", entries.len(), files.len());
        entries
    };

    let state = Arc::new(Mutex::new(Study::new(entries, config.retired_bucket)));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("serving at http://localhost:{}", config.port);
    axum::serve(listener, app).await
}
