use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hooki_shared::geo::{filter_within_radius, GeoPoint};
use hooki_shared::models::{Match, Message, Post, ProfileUpdate, Reply, UserProfile};
use hooki_shared::types::{ConnectionId, ConversationId, PostId, UserId};
use hooki_store::Store;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::fanout::{PostFanout, PostView};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::registry::IdentityRegistry;
use crate::router::MessageRouter;
use crate::ws::ws_handler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn Store>,
    pub registry: IdentityRegistry,
    pub router: MessageRouter,
    pub posts: PostFanout,
    pub rate_limiter: RateLimiter<IpAddr>,
    pub message_limiter: RateLimiter<ConnectionId>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the registry, router and fan-out around one shared store.
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Self {
        let registry = IdentityRegistry::new();
        let router = MessageRouter::new(store.clone(), registry.clone());
        let posts = PostFanout::new(store.clone(), registry.clone());
        let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);
        let message_limiter =
            RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

        Self {
            config: Arc::new(config),
            store,
            registry,
            router,
            posts,
            rate_limiter,
            message_limiter,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/reply", post(reply_post))
        .route("/matches", post(create_match))
        .route("/matches/:user_id", get(list_matches))
        .route(
            "/conversations/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/:id/read", post(mark_read))
        .route("/users", post(create_user))
        .route("/users/nearby", get(nearby_users))
        .route("/users/:id", get(get_user).put(update_user))
        .route("/users/:id/block", post(block_user))
        .route("/users/:id/block/:blocked_id", delete(unblock_user))
        .route("/users/:id/blocked", get(blocked_users))
        .route("/users/:id/report", post(report_user))
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    connections: usize,
    online_users: usize,
    uptime_secs: u64,
    post_radius_m: f64,
    user_radius_m: f64,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Serialize)]
struct MarkReadResponse {
    marked: usize,
}

#[derive(Deserialize)]
struct RadiusQuery {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
    radius: Option<f64>,
}

#[derive(Deserialize)]
struct NearbyQuery {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
    radius: Option<f64>,
    exclude: Option<UserId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    user_id: UserId,
    content: String,
    location: Option<GeoPoint>,
    venue_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeRequest {
    user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest {
    user_id: UserId,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMatchRequest {
    user_id1: UserId,
    user_id2: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    sender_id: UserId,
    content: String,
    #[serde(default)]
    client_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadRequest {
    reader_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    id: UserId,
    email: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRequest {
    blocked_user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    reported_user_id: UserId,
    #[serde(default)]
    reason: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        connections: state.registry.connection_count().await,
        online_users: state.registry.online_user_count().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
        post_radius_m: state.config.default_post_radius_m,
        user_radius_m: state.config.default_user_radius_m,
    })
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<RadiusQuery>,
) -> Result<Json<Vec<PostView>>, ServerError> {
    let origin = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)?),
        _ => None,
    };
    let radius = query.radius.unwrap_or(state.config.default_post_radius_m);

    let posts = state.posts.list(origin, radius).await?;
    Ok(Json(posts))
}

async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Post>, ServerError> {
    let post = state
        .posts
        .create_post(req.user_id, req.content, req.location, req.venue_name)
        .await?;
    Ok(Json(post))
}

async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<Post>, ServerError> {
    let post = state.posts.like(&id, &req.user_id).await?;
    Ok(Json(post))
}

async fn reply_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Reply>, ServerError> {
    let reply = state.posts.reply(&id, req.user_id, req.content).await?;
    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// Matches and conversations
// ---------------------------------------------------------------------------

async fn create_match(
    State(state): State<AppState>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<Match>, ServerError> {
    let m = state.router.create_match(req.user_id1, req.user_id2).await?;
    Ok(Json(m))
}

async fn list_matches(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Match>>, ServerError> {
    Ok(Json(state.router.matches_for(&user_id).await?))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<Message>>, ServerError> {
    Ok(Json(state.router.history(&id).await?))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let message = state
        .router
        .route(&id, &req.sender_id, &req.content, req.client_token)
        .await?;
    Ok(Json(message))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ServerError> {
    let marked = state.router.mark_read(&id, &req.reader_id).await?;
    Ok(Json(MarkReadResponse { marked }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Registers a profile. Registering an existing id merges the supplied
/// fields into it.
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserProfile>, ServerError> {
    if req.id.is_blank() {
        return Err(ServerError::BadRequest("id is required".to_string()));
    }

    let mut profile = state
        .store
        .get_user(&req.id)?
        .unwrap_or_else(|| UserProfile::new(req.id.clone()));
    profile.apply(ProfileUpdate {
        email: req.email,
        name: req.name,
        avatar: req.avatar,
        ..ProfileUpdate::default()
    });
    state.store.put_user(&profile)?;

    info!(user = %profile.id, "User registered");
    Ok(Json(profile))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>, ServerError> {
    state
        .store
        .get_user(&id)?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("user not found: {id}")))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ServerError> {
    let mut profile = state
        .store
        .get_user(&id)?
        .ok_or_else(|| ServerError::NotFound(format!("user not found: {id}")))?;

    let update = ProfileUpdate {
        location: update.location.map(GeoPoint::validated).transpose()?,
        ..update
    };
    profile.apply(update);
    state.store.put_user(&profile)?;

    Ok(Json(profile))
}

async fn nearby_users(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<UserProfile>>, ServerError> {
    let origin = GeoPoint::new(query.latitude, query.longitude)?;
    let radius = query.radius.unwrap_or(state.config.default_user_radius_m);

    let mut users = filter_within_radius(
        state.store.list_users()?,
        origin.latitude,
        origin.longitude,
        radius,
    );

    if let Some(viewer) = &query.exclude {
        let blocked: HashSet<UserId> = state.store.blocked_users(viewer)?.into_iter().collect();
        users.retain(|u| &u.id != viewer && !blocked.contains(&u.id));
    }

    Ok(Json(users))
}

async fn block_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    if req.blocked_user_id.is_blank() || req.blocked_user_id == id {
        return Err(ServerError::BadRequest(
            "blockedUserId must name another user".to_string(),
        ));
    }
    if state.store.block_user(&id, &req.blocked_user_id)? {
        info!(user = %id, blocked = %req.blocked_user_id, "User blocked");
    }
    Ok(Json(SuccessResponse { success: true }))
}

async fn unblock_user(
    State(state): State<AppState>,
    Path((id, blocked_id)): Path<(UserId, UserId)>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let removed = state.store.unblock_user(&id, &blocked_id)?;
    Ok(Json(SuccessResponse { success: removed }))
}

async fn blocked_users(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<UserId>>, ServerError> {
    Ok(Json(state.store.blocked_users(&id)?))
}

async fn report_user(
    Path(id): Path<UserId>,
    Json(req): Json<ReportRequest>,
) -> Json<SuccessResponse> {
    warn!(
        reporter = %id,
        reported = %req.reported_user_id,
        reason = %req.reason,
        "User reported"
    );
    Json(SuccessResponse { success: true })
}

/// Start the HTTP + WebSocket server.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP API listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use hooki_shared::constants::ANONYMOUS_NAME;
    use hooki_shared::events::ServerEvent;
    use hooki_store::{MemoryStore, SqliteStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(ServerConfig::default(), Arc::new(MemoryStore::new()))
    }

    async fn call(
        state: &AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_info() {
        let state = test_state();
        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = call(&state, "GET", "/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Hooki");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn test_live_delivery_and_rest_history() {
        let state = test_state();
        let (a_conn, mut a_rx) = state.registry.register().await;
        let (b_conn, mut b_rx) = state.registry.register().await;
        state.registry.announce(a_conn, UserId::from("a")).await;
        state.registry.announce(b_conn, UserId::from("b")).await;

        let (status, m) = call(
            &state,
            "POST",
            "/matches",
            Some(json!({"userId1": "b", "userId2": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(m["id"], "a_b");
        assert!(matches!(a_rx.try_recv(), Ok(ServerEvent::NewMatch(_))));
        assert!(matches!(b_rx.try_recv(), Ok(ServerEvent::NewMatch(_))));

        let (status, sent) = call(
            &state,
            "POST",
            "/conversations/a_b/messages",
            Some(json!({"senderId": "a", "content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["seq"], 1);

        match b_rx.try_recv().unwrap() {
            ServerEvent::NewMessage(msg) => assert_eq!(msg.content, "hi"),
            other => panic!("unexpected event {other:?}"),
        }

        let (status, history) = call(&state, "GET", "/conversations/a_b/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["senderId"], "a");

        let (_, matches) = call(&state, "GET", "/matches/b", None).await;
        assert_eq!(matches[0]["lastMessage"], "hi");
    }

    #[tokio::test]
    async fn test_conversation_errors() {
        let state = test_state();
        let (status, body) = call(&state, "GET", "/conversations/lonely/messages", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = call(&state, "GET", "/conversations/x_y/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        call(
            &state,
            "POST",
            "/matches",
            Some(json!({"userId1": "a", "userId2": "b"})),
        )
        .await;

        let (status, _) = call(
            &state,
            "POST",
            "/conversations/a_b/messages",
            Some(json!({"senderId": "c", "content": "let me in"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &state,
            "POST",
            "/conversations/a_b/messages",
            Some(json!({"senderId": "a", "content": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, history) = call(&state, "GET", "/conversations/a_b/messages", None).await;
        assert!(history.as_array().unwrap().is_empty());

        let (status, _) = call(
            &state,
            "POST",
            "/matches",
            Some(json!({"userId1": "a", "userId2": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_message_without_prior_match() {
        let state = test_state();
        let (b_conn, mut b_rx) = state.registry.register().await;
        state.registry.announce(b_conn, UserId::from("b")).await;

        let (status, sent) = call(
            &state,
            "POST",
            "/conversations/a_b/messages",
            Some(json!({"senderId": "a", "content": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["seq"], 1);
        assert!(matches!(b_rx.try_recv(), Ok(ServerEvent::NewMatch(_))));
        assert!(matches!(b_rx.try_recv(), Ok(ServerEvent::NewMessage(_))));

        let (_, matches) = call(&state, "GET", "/matches/b", None).await;
        assert_eq!(matches[0]["id"], "a_b");
        assert_eq!(matches[0]["lastMessage"], "hi");
    }

    #[tokio::test]
    async fn test_mark_read_endpoint() {
        let state = test_state();
        call(
            &state,
            "POST",
            "/matches",
            Some(json!({"userId1": "a", "userId2": "b"})),
        )
        .await;
        for text in ["one", "two"] {
            call(
                &state,
                "POST",
                "/conversations/a_b/messages",
                Some(json!({"senderId": "a", "content": text})),
            )
            .await;
        }

        let (status, body) = call(
            &state,
            "POST",
            "/conversations/a_b/read",
            Some(json!({"readerId": "b"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["marked"], 2);

        let (_, body) = call(
            &state,
            "POST",
            "/conversations/a_b/read",
            Some(json!({"readerId": "b"})),
        )
        .await;
        assert_eq!(body["marked"], 0);
    }

    #[tokio::test]
    async fn test_post_radius_filter() {
        let state = test_state();
        let (status, post) = call(
            &state,
            "POST",
            "/posts",
            Some(json!({
                "userId": "author",
                "content": "Jazz at the corner bar",
                "location": {"latitude": 10.0, "longitude": 10.0},
                "venueName": "Corner Bar"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["venueName"], "Corner Bar");

        let (_, near) = call(&state, "GET", "/posts?lat=10.001&lon=10.001&radius=500", None).await;
        assert_eq!(near.as_array().unwrap().len(), 1);
        assert_eq!(near[0]["userName"], ANONYMOUS_NAME);
        assert_eq!(near[0]["content"], "Jazz at the corner bar");

        let (_, none) = call(&state, "GET", "/posts?lat=10.001&lon=10.001&radius=0", None).await;
        assert!(none.as_array().unwrap().is_empty());

        let (_, aliased) = call(
            &state,
            "GET",
            "/posts?latitude=10.001&longitude=10.001&radius=500",
            None,
        )
        .await;
        assert_eq!(aliased.as_array().unwrap().len(), 1);

        let (status, _) = call(&state, "GET", "/posts?lat=91&lon=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_like_and_reply() {
        let state = test_state();
        let (_, post) = call(
            &state,
            "POST",
            "/posts",
            Some(json!({"userId": "author", "content": "hello"})),
        )
        .await;
        let id = post["id"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let (status, liked) = call(
                &state,
                "POST",
                &format!("/posts/{id}/like"),
                Some(json!({"userId": "fan"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(liked["likes"], json!(["fan"]));
        }

        let (status, reply) = call(
            &state,
            "POST",
            &format!("/posts/{id}/reply"),
            Some(json!({"userId": "fan", "content": "see you there"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["userId"], "fan");

        let (status, _) = call(
            &state,
            "POST",
            "/posts/hook_missing/like",
            Some(json!({"userId": "fan"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_profile_lifecycle() {
        let state = test_state();
        let (status, user) = call(
            &state,
            "POST",
            "/users",
            Some(json!({"id": "u1", "email": "u1@example.com", "name": "Uma"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["name"], "Uma");

        let (status, user) = call(
            &state,
            "PUT",
            "/users/u1",
            Some(json!({"bio": "coffee", "location": {"latitude": 10.0, "longitude": 10.0}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["bio"], "coffee");
        assert_eq!(user["name"], "Uma");

        let (status, user) = call(&state, "GET", "/users/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["location"]["latitude"], 10.0);

        let (status, _) = call(&state, "GET", "/users/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "PUT", "/users/ghost", Some(json!({"bio": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nearby_users_respects_blocks() {
        let state = test_state();
        for id in ["me", "near", "blocked"] {
            call(&state, "POST", "/users", Some(json!({"id": id}))).await;
            call(
                &state,
                "PUT",
                &format!("/users/{id}"),
                Some(json!({"location": {"latitude": 10.0, "longitude": 10.0}})),
            )
            .await;
        }
        call(&state, "POST", "/users", Some(json!({"id": "far"}))).await;
        call(
            &state,
            "PUT",
            "/users/far",
            Some(json!({"location": {"latitude": 20.0, "longitude": 20.0}})),
        )
        .await;

        let (_, all) = call(&state, "GET", "/users/nearby?latitude=10.001&longitude=10.001", None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (status, _) = call(
            &state,
            "POST",
            "/users/me/block",
            Some(json!({"blockedUserId": "blocked"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, blocked) = call(&state, "GET", "/users/me/blocked", None).await;
        assert_eq!(blocked, json!(["blocked"]));

        let (_, visible) = call(
            &state,
            "GET",
            "/users/nearby?latitude=10.001&longitude=10.001&exclude=me",
            None,
        )
        .await;
        let ids: Vec<&str> = visible
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["near"]);

        let (_, body) = call(&state, "DELETE", "/users/me/block/blocked", None).await;
        assert_eq!(body["success"], true);
        let (_, blocked) = call(&state, "GET", "/users/me/blocked", None).await;
        assert_eq!(blocked, json!([]));
    }

    #[tokio::test]
    async fn test_offline_history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooki.db");

        {
            let store = SqliteStore::open_at(&path).unwrap();
            let state = AppState::new(ServerConfig::default(), Arc::new(store));
            call(
                &state,
                "POST",
                "/matches",
                Some(json!({"userId1": "a", "userId2": "b"})),
            )
            .await;
            // Nobody is connected; the message is only persisted.
            let (status, _) = call(
                &state,
                "POST",
                "/conversations/a_b/messages",
                Some(json!({"senderId": "a", "content": "are you there?"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let store = SqliteStore::open_at(&path).unwrap();
        let state = AppState::new(ServerConfig::default(), Arc::new(store));
        let (status, history) = call(&state, "GET", "/conversations/a_b/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["content"], "are you there?");
        assert_eq!(history[0]["read"], false);
    }

    #[tokio::test]
    async fn test_report_user() {
        let state = test_state();
        let (status, body) = call(
            &state,
            "POST",
            "/users/me/report",
            Some(json!({"reportedUserId": "spammer", "reason": "spam"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}
