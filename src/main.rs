use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use judhur_api::cache::ResponseCache;
use judhur_api::error::JudhurError;
use judhur_api::metadata::SurahMetadata;
use judhur_api::search::{SearchEngine, SurahProfile, VerseDetail};
use judhur_api::stats::{self, GlobalStatistics, Statistics};
use judhur_api::suggest::SuggestionIndex;
use judhur_api::tokens::SearchResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

const RESULT_CACHE_CAPACITY: usize = 256;
const RESULT_CACHE_TTL: Duration = Duration::from_secs(600);

struct AppState {
    engine: SearchEngine,
    metadata: Arc<SurahMetadata>,
    suggestions: SuggestionIndex,
    search_cache: ResponseCache<SearchResult>,
    stats_cache: ResponseCache<RootStatisticsResponse>,
    global_cache: ResponseCache<GlobalStatistics>,
}

// === Request/Response types ===

#[derive(Deserialize)]
struct SuggestQuery {
    q: Option<String>,
}

#[derive(Serialize, Clone)]
struct RootStatisticsResponse {
    root: String,
    statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct SurahSummary {
    number: u32,
    name: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    surahs: usize,
    roots_indexed: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: JudhurError) -> HandlerError {
    let status = match &err {
        JudhurError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        JudhurError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        JudhurError::Inconsistent(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn not_found(message: &str) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        surahs: state.metadata.len(),
        roots_indexed: state.suggestions.root_count(),
    })
}

async fn search_root(
    State(state): State<Arc<AppState>>,
    Path(root): Path<String>,
) -> Result<Json<SearchResult>, HandlerError> {
    let key = format!("root:{}", root.trim());
    if let Some(hit) = state.search_cache.get(&key) {
        return Ok(Json((*hit).clone()));
    }

    let result = state.engine.search_root(&root).map_err(error_response)?;
    state.search_cache.set(key, result.clone());
    Ok(Json(result))
}

async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestQuery>,
) -> Json<Vec<String>> {
    Json(state.suggestions.query(params.q.as_deref().unwrap_or("")))
}

async fn root_statistics(
    State(state): State<Arc<AppState>>,
    Path(root): Path<String>,
) -> Result<Json<RootStatisticsResponse>, HandlerError> {
    let key = format!("stats:{}", root.trim());
    if let Some(hit) = state.stats_cache.get(&key) {
        return Ok(Json((*hit).clone()));
    }

    let result = state.engine.search_root(&root).map_err(error_response)?;
    let statistics = stats::compute(&result, &state.metadata);
    let response = RootStatisticsResponse {
        message: statistics
            .is_none()
            .then(|| "لا توجد نتائج لهذا الجذر".to_string()),
        root: result.root,
        statistics,
    };
    state.stats_cache.set(key, response.clone());
    Ok(Json(response))
}

async fn get_ayah(
    State(state): State<Arc<AppState>>,
    Path(global_id): Path<u32>,
) -> Result<Json<VerseDetail>, HandlerError> {
    state
        .engine
        .verse_by_global_id(global_id)
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| not_found("Ayah not found"))
}

async fn list_surahs(State(state): State<Arc<AppState>>) -> Json<Vec<SurahSummary>> {
    let surahs = (1..=114)
        .map(|number| SurahSummary {
            number,
            name: state.metadata.name(number),
        })
        .collect();
    Json(surahs)
}

async fn surah_profile(
    State(state): State<Arc<AppState>>,
    Path(surah_no): Path<u32>,
) -> Result<Json<SurahProfile>, HandlerError> {
    if !(1..=114).contains(&surah_no) {
        return Err(not_found("Invalid Surah Number"));
    }
    state
        .engine
        .surah_profile(surah_no)
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| not_found("Surah not found"))
}

async fn global_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalStatistics>, HandlerError> {
    if let Some(hit) = state.global_cache.get("global") {
        return Ok(Json((*hit).clone()));
    }
    let snapshot = state.engine.global_statistics().map_err(error_response)?;
    state.global_cache.set("global", snapshot.clone());
    Ok(Json(snapshot))
}

async fn roots_by_length(
    State(state): State<Arc<AppState>>,
    Path(length): Path<usize>,
) -> Result<Json<judhur_api::stats::RootsByLength>, HandlerError> {
    state
        .engine
        .roots_by_length(length)
        .map(Json)
        .map_err(error_response)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db_path = std::env::var("JUDHUR_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/opt/judhur/data/corpus.db"));

    let conn = rusqlite::Connection::open(&db_path)?;
    let metadata = Arc::new(SurahMetadata::load(&conn)?);
    let suggestions = SuggestionIndex::build(&conn)?;
    drop(conn);

    let engine = SearchEngine::new(db_path, Arc::clone(&metadata));

    let state = Arc::new(AppState {
        engine,
        metadata,
        suggestions,
        search_cache: ResponseCache::new(RESULT_CACHE_CAPACITY, RESULT_CACHE_TTL),
        stats_cache: ResponseCache::new(RESULT_CACHE_CAPACITY, RESULT_CACHE_TTL),
        global_cache: ResponseCache::new(1, RESULT_CACHE_TTL),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/search/root/:root", get(search_root))
        .route("/api/search/suggest", get(suggest))
        .route("/api/search/statistics/:root", get(root_statistics))
        .route("/api/ayah/:global_id", get(get_ayah))
        .route("/api/surahs", get(list_surahs))
        .route("/api/surahs/:surah_no", get(surah_profile))
        .route("/api/statistics/global", get(global_statistics))
        .route("/api/statistics/roots-by-length/:length", get(roots_by_length))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;

    Ok(())
}
