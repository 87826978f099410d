use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;
use warp::Reply;
use warp::http::StatusCode;

use crate::auth::{SessionClaims, SessionIssuer};
use crate::state::LiveStateManager;
use crate::websocket::ConnectionManager;
use arena_persistence::RepoError;
use arena_persistence::repositories::{ScoreRepository, UserRepository};
use arena_types::{ApiError, GameType, NewUser};

pub mod auth;
pub mod config;
pub mod state;
pub mod websocket;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    student_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    student_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityRequest {
    game_type: GameType,
    is_visible: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetRoundRequest {
    game_type: GameType,
    round: u8,
}

#[derive(Deserialize)]
struct ClearQuery {
    round: Option<u8>,
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    live_state: Arc<LiveStateManager>,
    session_issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
    score_repository: Arc<ScoreRepository>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let live_state_filter = warp::any().map({
        let live_state = live_state.clone();
        move || live_state.clone()
    });

    let issuer_filter = warp::any().map({
        let session_issuer = session_issuer.clone();
        move || session_issuer.clone()
    });

    let user_repository_filter = warp::any().map({
        let user_repository = user_repository.clone();
        move || user_repository.clone()
    });

    let score_repository_filter = warp::any().map({
        let score_repository = score_repository.clone();
        move || score_repository.clone()
    });

    // WebSocket endpoint; the session token travels as a query
    // parameter and is checked before the upgrade.
    let websocket = warp::path("ws")
        .and(warp::query::<WsQuery>())
        .and(warp::ws())
        .and(issuer_filter.clone())
        .and(connection_manager_filter.clone())
        .and(live_state_filter.clone())
        .and(score_repository_filter.clone())
        .and_then(handle_ws_upgrade);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_login);

    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_register);

    // Unauthenticated: the client fetches this once before the
    // socket connects.
    let game_state = warp::path!("game" / "state")
        .and(warp::get())
        .and(live_state_filter.clone())
        .and_then(handle_game_state);

    let leaderboard = warp::path!("game" / "leaderboard" / String / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(score_repository_filter.clone())
        .and_then(handle_leaderboard);

    let admin_list_users = warp::path!("admin" / "users")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_list_users);

    let admin_create_user = warp::path!("admin" / "users")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_create_user);

    let admin_bulk_users = warp::path!("admin" / "users" / "bulk")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_bulk_users);

    let admin_delete_user = warp::path!("admin" / "users" / String)
        .and(warp::delete())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(user_repository_filter.clone())
        .and_then(handle_delete_user);

    let admin_clear_all = warp::path!("admin" / "leaderboard")
        .and(warp::delete())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(score_repository_filter.clone())
        .and_then(handle_clear_all);

    let admin_clear_game = warp::path!("admin" / "leaderboard" / String)
        .and(warp::delete())
        .and(warp::query::<ClearQuery>())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(score_repository_filter.clone())
        .and_then(handle_clear_game);

    let admin_visibility = warp::path!("admin" / "game" / "visibility")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(live_state_filter.clone())
        .and_then(handle_set_visibility);

    let admin_set_round = warp::path!("admin" / "game" / "set-round")
        .and(warp::post())
        .and(warp::body::json())
        .and(warp::header::optional::<String>("authorization"))
        .and(issuer_filter.clone())
        .and(live_state_filter.clone())
        .and_then(handle_set_round);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    websocket
        .or(health)
        .or(login)
        .or(register)
        .or(game_state)
        .or(leaderboard)
        .or(admin_bulk_users)
        .or(admin_list_users)
        .or(admin_create_user)
        .or(admin_delete_user)
        .or(admin_clear_game)
        .or(admin_clear_all)
        .or(admin_visibility)
        .or(admin_set_round)
        .with(cors)
        .with(warp::log("arena_server"))
}

type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

fn json_reply<T: serde::Serialize>(value: &T) -> JsonReply {
    warp::reply::with_status(warp::reply::json(value), StatusCode::OK)
}

fn error_reply(err: &ApiError) -> JsonReply {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": err.to_string() })),
        status,
    )
}

fn repo_error(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate(msg) => ApiError::Duplicate(msg),
        RepoError::NotFound => ApiError::NotFound("user not found".to_string()),
        RepoError::Db(e) => {
            tracing::error!("database error: {e}");
            ApiError::Storage("store unavailable".to_string())
        }
    }
}

fn authenticate(
    auth_header: Option<String>,
    issuer: &SessionIssuer,
) -> Result<SessionClaims, ApiError> {
    let header = auth_header
        .ok_or_else(|| ApiError::Authentication("missing authorization header".to_string()))?;
    let token = header.strip_prefix("Bearer ").unwrap_or(&header);

    issuer
        .verify(token)
        .map_err(|e| ApiError::Authentication(e.to_string()))
}

fn require_admin(
    auth_header: Option<String>,
    issuer: &SessionIssuer,
) -> Result<SessionClaims, ApiError> {
    let claims = authenticate(auth_header, issuer)?;
    if !claims.is_admin {
        return Err(ApiError::Authorization);
    }
    Ok(claims)
}

fn parse_round(raw: &str) -> Result<u8, ApiError> {
    let round: u8 = raw
        .parse()
        .map_err(|_| ApiError::Validation(format!("invalid round: {raw}")))?;
    arena_core::live_state::validate_round(round)?;
    Ok(round)
}

async fn handle_ws_upgrade(
    query: WsQuery,
    ws: warp::ws::Ws,
    issuer: Arc<SessionIssuer>,
    connection_manager: Arc<ConnectionManager>,
    live_state: Arc<LiveStateManager>,
    score_repository: Arc<ScoreRepository>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let claims = match query.token.as_deref().map(|token| issuer.verify(token)) {
        Some(Ok(claims)) => claims,
        Some(Err(e)) => {
            tracing::warn!("refusing WebSocket connection: {e}");
            return Ok(error_reply(&ApiError::Authentication(e.to_string())).into_response());
        }
        None => {
            return Ok(error_reply(&ApiError::Authentication(
                "missing session token".to_string(),
            ))
            .into_response());
        }
    };

    Ok(ws
        .on_upgrade(move |socket| {
            websocket::handle_connection(
                socket,
                claims,
                connection_manager,
                live_state,
                score_repository,
            )
        })
        .into_response())
}

async fn handle_login(
    body: LoginRequest,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    let user = match user_repository.find_by_student_id(&body.student_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(error_reply(&ApiError::Authentication(
                "invalid credentials".to_string(),
            )));
        }
        Err(e) => return Ok(error_reply(&repo_error(e))),
    };

    match issuer.issue(&user) {
        Ok(token) => Ok(json_reply(&serde_json::json!({ "token": token }))),
        Err(e) => {
            tracing::error!("failed to issue session token: {e}");
            Ok(error_reply(&ApiError::Storage(
                "failed to issue session token".to_string(),
            )))
        }
    }
}

async fn handle_register(
    body: RegisterRequest,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if body.name.trim().is_empty() || body.student_id.trim().is_empty() {
        return Ok(error_reply(&ApiError::Validation(
            "name and studentId are required".to_string(),
        )));
    }

    // Self-registration never grants admin.
    let new_user = NewUser {
        name: body.name.trim().to_string(),
        student_id: body.student_id.trim().to_string(),
        is_admin: false,
    };

    let user = match user_repository.create(new_user).await {
        Ok(user) => user,
        Err(RepoError::Duplicate(_)) => {
            return Ok(error_reply(&ApiError::Duplicate(
                "user already exists".to_string(),
            )));
        }
        Err(e) => return Ok(error_reply(&repo_error(e))),
    };

    match issuer.issue(&user) {
        Ok(token) => Ok(json_reply(&serde_json::json!({ "token": token }))),
        Err(e) => {
            tracing::error!("failed to issue session token: {e}");
            Ok(error_reply(&ApiError::Storage(
                "failed to issue session token".to_string(),
            )))
        }
    }
}

async fn handle_game_state(
    live_state: Arc<LiveStateManager>,
) -> Result<JsonReply, warp::Rejection> {
    Ok(json_reply(&live_state.snapshot().await))
}

async fn handle_leaderboard(
    game_type: String,
    round: String,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    score_repository: Arc<ScoreRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = authenticate(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    let game_type: GameType = match game_type.parse() {
        Ok(game_type) => game_type,
        Err(e) => return Ok(error_reply(&e)),
    };
    let round = match parse_round(&round) {
        Ok(round) => round,
        Err(e) => return Ok(error_reply(&e)),
    };

    match score_repository.leaderboard(game_type, round).await {
        Ok(entries) => Ok(json_reply(&entries)),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_list_users(
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    match user_repository.list_all().await {
        Ok(users) => Ok(json_reply(&users)),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_create_user(
    body: NewUser,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    if body.name.trim().is_empty() || body.student_id.trim().is_empty() {
        return Ok(error_reply(&ApiError::Validation(
            "name and studentId are required".to_string(),
        )));
    }

    match user_repository.create(body).await {
        Ok(user) => Ok(json_reply(&user)),
        Err(RepoError::Duplicate(_)) => Ok(error_reply(&ApiError::Duplicate(
            "user already exists".to_string(),
        ))),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_bulk_users(
    body: Vec<NewUser>,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    match user_repository.bulk_insert(body).await {
        Ok(report) => Ok(json_reply(&report)),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_delete_user(
    user_id: String,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    user_repository: Arc<UserRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    let user_id = match Uuid::parse_str(&user_id) {
        Ok(id) => id,
        Err(_) => {
            return Ok(error_reply(&ApiError::Validation(
                "invalid user id".to_string(),
            )));
        }
    };

    match user_repository.delete_by_id(user_id).await {
        Ok(()) => Ok(json_reply(&serde_json::json!({ "msg": "User deleted" }))),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_clear_all(
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    score_repository: Arc<ScoreRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    match score_repository.clear(None, None).await {
        Ok(deleted) => Ok(json_reply(
            &serde_json::json!({ "msg": "Leaderboard cleared", "deleted": deleted }),
        )),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_clear_game(
    game_type: String,
    query: ClearQuery,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    score_repository: Arc<ScoreRepository>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    let game_type: GameType = match game_type.parse() {
        Ok(game_type) => game_type,
        Err(e) => return Ok(error_reply(&e)),
    };

    if let Some(round) = query.round {
        if let Err(e) = arena_core::live_state::validate_round(round) {
            return Ok(error_reply(&e));
        }
    }

    match score_repository.clear(Some(game_type), query.round).await {
        Ok(deleted) => Ok(json_reply(
            &serde_json::json!({ "msg": "Leaderboard cleared", "deleted": deleted }),
        )),
        Err(e) => Ok(error_reply(&repo_error(e))),
    }
}

async fn handle_set_visibility(
    body: VisibilityRequest,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    live_state: Arc<LiveStateManager>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    let action = arena_types::AdminAction::SetVisibility {
        game_type: body.game_type,
        is_visible: body.is_visible,
    };

    match live_state.apply(&action).await {
        Ok(new_state) => Ok(json_reply(&new_state)),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn handle_set_round(
    body: SetRoundRequest,
    auth_header: Option<String>,
    issuer: Arc<SessionIssuer>,
    live_state: Arc<LiveStateManager>,
) -> Result<JsonReply, warp::Rejection> {
    if let Err(e) = require_admin(auth_header, &issuer) {
        return Ok(error_reply(&e));
    }

    let action = arena_types::AdminAction::SetRound {
        game_type: body.game_type,
        round: body.round,
    };

    match live_state.apply(&action).await {
        Ok(new_state) => Ok(json_reply(&new_state)),
        Err(e) => Ok(error_reply(&e)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use arena_persistence::connection::connect_to_memory_database;
    use arena_types::{ClientMessage, LeaderboardEntry, ServerMessage, User};
    use migration::{Migrator, MigratorTrait};
    use std::time::Duration;

    struct TestContext {
        issuer: Arc<SessionIssuer>,
        users: Arc<UserRepository>,
        scores: Arc<ScoreRepository>,
    }

    async fn create_test_app() -> (
        impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone,
        TestContext,
    ) {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let connection_manager = Arc::new(ConnectionManager::new());
        let live_state = Arc::new(LiveStateManager::new(connection_manager.clone()));
        let issuer = Arc::new(SessionIssuer::new(
            "test-secret",
            Duration::from_secs(3600),
        ));
        let users = Arc::new(UserRepository::new(db.clone()));
        let scores = Arc::new(ScoreRepository::new(db));

        let routes = create_routes(
            connection_manager,
            live_state,
            issuer.clone(),
            users.clone(),
            scores.clone(),
        );

        (
            routes,
            TestContext {
                issuer,
                users,
                scores,
            },
        )
    }

    async fn create_user_with_token(
        ctx: &TestContext,
        name: &str,
        student_id: &str,
        is_admin: bool,
    ) -> (User, String) {
        let user = ctx
            .users
            .create(NewUser {
                name: name.to_string(),
                student_id: student_id.to_string(),
                is_admin,
            })
            .await
            .unwrap();
        let token = ctx.issuer.issue(&user).unwrap();
        (user, token)
    }

    fn recv_server_message(msg: &warp::ws::Message) -> ServerMessage {
        serde_json::from_str(msg.to_str().unwrap()).expect("should be a valid ServerMessage")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_login_unknown_student_id_is_unauthorized() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&serde_json::json!({ "studentId": "99999999" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn test_login_returns_verifiable_token() {
        let (app, ctx) = create_test_app().await;
        let (user, _) = create_user_with_token(&ctx, "Alice", "20250001", false).await;

        let response = warp::test::request()
            .method("POST")
            .path("/auth/login")
            .json(&serde_json::json!({ "studentId": "20250001" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        let claims = ctx.issuer.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(!claims.is_admin);
    }

    #[tokio::test]
    async fn test_register_creates_non_admin_and_rejects_duplicates() {
        let (app, ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path("/auth/register")
            .json(&serde_json::json!({ "name": "Bob", "studentId": "20250002" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);

        let user = ctx
            .users
            .find_by_student_id("20250002")
            .await
            .unwrap()
            .unwrap();
        assert!(!user.is_admin);

        let response = warp::test::request()
            .method("POST")
            .path("/auth/register")
            .json(&serde_json::json!({ "name": "Bob Again", "studentId": "20250002" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_game_state_defaults_to_round_one_hidden() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/game/state")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let state: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(state["timingGame"]["currentRound"], 1);
        assert_eq!(state["timingGame"]["isVisible"], false);
        assert_eq!(state["fastHandGame"]["currentRound"], 1);
    }

    #[tokio::test]
    async fn test_leaderboard_requires_authentication() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/game/leaderboard/timing_game/1")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn test_leaderboard_empty_round_yields_empty_list() {
        let (app, ctx) = create_test_app().await;
        let (_, token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let response = warp::test::request()
            .method("GET")
            .path("/game/leaderboard/timing_game/1")
            .header("authorization", format!("Bearer {token}"))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let entries: Vec<LeaderboardEntry> = serde_json::from_slice(response.body()).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_bad_game_type_and_round() {
        let (app, ctx) = create_test_app().await;
        let (_, token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let response = warp::test::request()
            .method("GET")
            .path("/game/leaderboard/chess/1")
            .header("authorization", format!("Bearer {token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 400);

        let response = warp::test::request()
            .method("GET")
            .path("/game/leaderboard/timing_game/9")
            .header("authorization", format!("Bearer {token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_missing_and_non_admin_sessions() {
        let (app, ctx) = create_test_app().await;
        let (_, player_token) = create_user_with_token(&ctx, "Player", "1", false).await;

        let response = warp::test::request()
            .method("GET")
            .path("/admin/users")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 401);

        let response = warp::test::request()
            .method("GET")
            .path("/admin/users")
            .header("authorization", format!("Bearer {player_token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_admin_creates_user_and_rejects_duplicate() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;

        let response = warp::test::request()
            .method("POST")
            .path("/admin/users")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "name": "Alice", "studentId": "20250001" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);

        let created: User = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(created.student_id, "20250001");
        assert!(!created.is_admin);

        let response = warp::test::request()
            .method("POST")
            .path("/admin/users")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "name": "Clone", "studentId": "20250001" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_bulk_import_reports_duplicates() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;

        let response = warp::test::request()
            .method("POST")
            .path("/admin/users/bulk")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!([
                { "name": "A", "studentId": "1" },
                { "name": "B", "studentId": "1" }
            ]))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let report: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(report["inserted"].as_array().unwrap().len(), 1);
        assert_eq!(report["inserted"][0]["name"], "A");
        assert_eq!(report["duplicates"], serde_json::json!(["1"]));
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_scores() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;
        let (player, _) = create_user_with_token(&ctx, "Alice", "1", false).await;

        ctx.scores
            .submit(player.id, GameType::TimingGame, 1, 200.0)
            .await
            .unwrap();

        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/admin/users/{}", player.id))
            .header("authorization", format!("Bearer {admin_token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);

        assert!(ctx.users.find_by_id(player.id).await.unwrap().is_none());
        assert!(
            ctx.scores
                .leaderboard(GameType::TimingGame, 1)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_user_is_not_found() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;

        let response = warp::test::request()
            .method("DELETE")
            .path(&format!("/admin/users/{}", Uuid::new_v4()))
            .header("authorization", format!("Bearer {admin_token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_clear_single_round_leaves_other_rounds() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;
        let (player, _) = create_user_with_token(&ctx, "Alice", "1", false).await;

        ctx.scores
            .submit(player.id, GameType::TimingGame, 1, 200.0)
            .await
            .unwrap();
        ctx.scores
            .submit(player.id, GameType::TimingGame, 2, 90.0)
            .await
            .unwrap();

        let response = warp::test::request()
            .method("DELETE")
            .path("/admin/leaderboard/timing_game?round=1")
            .header("authorization", format!("Bearer {admin_token}"))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);

        assert!(
            ctx.scores
                .leaderboard(GameType::TimingGame, 1)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            ctx.scores
                .leaderboard(GameType::TimingGame, 2)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_set_round_rejects_out_of_range_and_keeps_state() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;

        let response = warp::test::request()
            .method("POST")
            .path("/admin/game/set-round")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "gameType": "timing_game", "round": 4 }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 400);

        let response = warp::test::request()
            .method("GET")
            .path("/game/state")
            .reply(&app)
            .await;
        let state: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(state["timingGame"]["currentRound"], 1);
    }

    #[tokio::test]
    async fn test_admin_mutations_return_new_state() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;

        let response = warp::test::request()
            .method("POST")
            .path("/admin/game/set-round")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "gameType": "fast_hand_game", "round": 3 }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let state: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(state["fastHandGame"]["currentRound"], 3);

        let response = warp::test::request()
            .method("POST")
            .path("/admin/game/visibility")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "gameType": "fast_hand_game", "isVisible": true }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let state: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(state["fastHandGame"]["isVisible"], true);
    }

    #[tokio::test]
    async fn test_websocket_refuses_missing_or_invalid_token() {
        let (app, _ctx) = create_test_app().await;

        let result = warp::test::ws().path("/ws").handshake(app.clone()).await;
        assert!(result.is_err());

        let result = warp::test::ws()
            .path("/ws?token=not-a-token")
            .handshake(app)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_websocket_connect_pushes_initial_snapshot() {
        let (app, ctx) = create_test_app().await;
        let (_, token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let mut ws = warp::test::ws()
            .path(&format!("/ws?token={token}"))
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        let msg = ws.recv().await.expect("should receive initial state");
        match recv_server_message(&msg) {
            ServerMessage::GameStateUpdate { state } => {
                assert_eq!(state.timing_game.current_round, 1);
                assert!(!state.timing_game.is_visible);
            }
            other => panic!("expected GameStateUpdate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_mutations_broadcast_in_order() {
        let (app, ctx) = create_test_app().await;
        let (_, admin_token) = create_user_with_token(&ctx, "MC", "0", true).await;
        let (_, player_token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let mut ws = warp::test::ws()
            .path(&format!("/ws?token={player_token}"))
            .handshake(app.clone())
            .await
            .expect("WebSocket handshake should succeed");

        // Consume the connect-time snapshot.
        let _ = ws.recv().await.expect("should receive initial state");

        warp::test::request()
            .method("POST")
            .path("/admin/game/set-round")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "gameType": "timing_game", "round": 2 }))
            .reply(&app)
            .await;

        warp::test::request()
            .method("POST")
            .path("/admin/game/visibility")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&serde_json::json!({ "gameType": "timing_game", "isVisible": true }))
            .reply(&app)
            .await;

        let first = ws.recv().await.expect("should receive first broadcast");
        match recv_server_message(&first) {
            ServerMessage::GameStateUpdate { state } => {
                assert_eq!(state.timing_game.current_round, 2);
                assert!(!state.timing_game.is_visible);
            }
            other => panic!("expected GameStateUpdate, got {other:?}"),
        }

        let second = ws.recv().await.expect("should receive second broadcast");
        match recv_server_message(&second) {
            ServerMessage::GameStateUpdate { state } => {
                assert_eq!(state.timing_game.current_round, 2);
                assert!(state.timing_game.is_visible);
            }
            other => panic!("expected GameStateUpdate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_websocket_score_submission_is_idempotent() {
        let (app, ctx) = create_test_app().await;
        let (_, token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let mut ws = warp::test::ws()
            .path(&format!("/ws?token={token}"))
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        let _ = ws.recv().await.expect("should receive initial state");

        let submit = serde_json::to_string(&ClientMessage::SubmitScore {
            game_type: GameType::FastHandGame,
            round: 1,
            score: 42.0,
        })
        .unwrap();

        ws.send_text(&submit).await;
        let msg = ws.recv().await.expect("should receive response");
        assert!(matches!(
            recv_server_message(&msg),
            ServerMessage::ScoreAccepted { .. }
        ));

        ws.send_text(&submit).await;
        let msg = ws.recv().await.expect("should receive response");
        match recv_server_message(&msg) {
            ServerMessage::ScoreRejected { reason } => {
                assert!(reason.contains("already played"));
            }
            other => panic!("expected ScoreRejected, got {other:?}"),
        }

        let board = ctx
            .scores
            .leaderboard(GameType::FastHandGame, 1)
            .await
            .unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 42.0);
    }

    #[tokio::test]
    async fn test_websocket_admin_command_requires_admin_claim() {
        let (app, ctx) = create_test_app().await;
        let (_, player_token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let mut ws = warp::test::ws()
            .path(&format!("/ws?token={player_token}"))
            .handshake(app.clone())
            .await
            .expect("WebSocket handshake should succeed");

        let _ = ws.recv().await.expect("should receive initial state");

        let command = serde_json::to_string(&ClientMessage::AdminUpdateState {
            action: arena_types::AdminAction::SetRound {
                game_type: GameType::TimingGame,
                round: 3,
            },
        })
        .unwrap();
        ws.send_text(&command).await;

        // The command is dropped: no reply arrives and the state is
        // untouched.
        let reply = tokio::time::timeout(Duration::from_millis(100), ws.recv()).await;
        assert!(reply.is_err());

        let response = warp::test::request()
            .method("GET")
            .path("/game/state")
            .reply(&app)
            .await;
        let state: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(state["timingGame"]["currentRound"], 1);
    }

    #[tokio::test]
    async fn test_websocket_invalid_json_closes_connection() {
        let (app, ctx) = create_test_app().await;
        let (_, token) = create_user_with_token(&ctx, "Alice", "1", false).await;

        let mut ws = warp::test::ws()
            .path(&format!("/ws?token={token}"))
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        let _ = ws.recv().await.expect("should receive initial state");

        ws.send_text("not json").await;

        // The incoming loop bails out, which tears the socket down.
        match tokio::time::timeout(Duration::from_secs(1), ws.recv()).await {
            Ok(Err(_)) | Err(_) => {}
            Ok(Ok(msg)) => panic!("expected connection teardown, got {msg:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_endpoints_cors() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("OPTIONS")
            .path("/health")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "GET")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn test_invalid_routes() {
        let (app, _ctx) = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/invalid")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 404);
    }
}
