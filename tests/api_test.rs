use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::test::RequestBuilder;
use warp::Filter;

use nihongo_api::auth::Argon2PasswordService;
use nihongo_api::config::ServerConfig;
use nihongo_api::core::{AppState, Clock, ManualClock, SystemClock};
use nihongo_api::routes;
use nihongo_api::storage::MemoryStorageProvider;

fn test_state(config: ServerConfig) -> AppState {
    test_state_with_clock(config, Arc::new(SystemClock))
}

fn test_state_with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> AppState {
    AppState::new(
        config,
        Arc::new(MemoryStorageProvider::with_clock(clock.clone())),
        Arc::new(Argon2PasswordService::for_testing()),
        clock,
    )
}

async fn send<F>(routes: &F, request: RequestBuilder) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = request.reply(routes).await;
    let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), body)
}

fn get(path: &str, token: Option<&str>) -> RequestBuilder {
    authorized(warp::test::request().method("GET").path(path), token)
}

fn with_body(method: &str, path: &str, token: Option<&str>, body: Value) -> RequestBuilder {
    authorized(
        warp::test::request().method(method).path(path).json(&body),
        token,
    )
}

fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header("authorization", format!("Bearer {}", token)),
        None => request,
    }
}

/// Registers an account and returns (user id, token)
async fn register<F>(routes: &F, username: &str, email: &str) -> (String, String)
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let (status, body) = send(
        routes,
        with_body(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "username": username,
                "email": email,
                "password": "senha123",
                "firstName": "Teste",
                "lastName": "Silva",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

async fn create_lesson<F>(routes: &F, admin_token: &str, order: u32) -> String
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let (status, body) = send(
        routes,
        with_body(
            "POST",
            "/api/admin/lessons",
            Some(admin_token),
            json!({
                "title": format!("Hiragana {}", order),
                "description": "Vogais",
                "level": "beginner",
                "category": "hiragana",
                "order": order,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "lesson creation failed: {}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_returns_token_without_password() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "username": "joao",
                "email": "joao@x.com",
                "password": "senha123",
                "firstName": "João",
                "lastName": "Silva",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Usuário criado com sucesso!");
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());

    let user = &body["data"]["user"];
    assert_eq!(user["username"], "joao");
    assert_eq!(user["role"], "user");
    assert_eq!(user["level"], "beginner");
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "username": "outro",
                "email": "JOAO@x.com",
                "password": "senha123",
                "firstName": "Outro",
                "lastName": "Nome",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_registration_validation_lists_errors() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/register",
            None,
            json!({"username": "jo", "email": "invalido", "password": "1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Dados de validação inválidos");
    assert_eq!(body["errors"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let request = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .header("content-type", "application/json")
        .body("{not json");
    let (status, body) = send(&routes, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "JSON inválido");
}

#[tokio::test]
async fn test_login_flow() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "joao@x.com", "password": "errada"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Email ou senha incorretos");

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "ninguem@x.com", "password": "senha123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Email ou senha incorretos");

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "joao@x.com", "password": "senha123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login realizado com sucesso!");
    assert!(!body["data"]["user"]["lastLogin"].is_null());

    let token = body["data"]["token"].as_str().unwrap();
    let (status, body) = send(&routes, get("/api/auth/verify", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Token válido");
    assert_eq!(body["data"]["user"]["email"], "joao@x.com");
}

#[tokio::test]
async fn test_refresh_issues_new_token() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let request = warp::test::request()
        .method("POST")
        .path("/api/auth/refresh")
        .header("authorization", format!("Bearer {}", token));
    let (status, body) = send(&routes, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Token renovado com sucesso!");
    let refreshed = body["data"]["token"].as_str().unwrap();
    let (status, _) = send(&routes, get("/api/auth/verify", Some(refreshed))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_authentication_failures() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let (status, body) = send(&routes, get("/api/users/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token de acesso não fornecido");

    let request = warp::test::request()
        .path("/api/users/profile")
        .header("authorization", "Token abc");
    let (status, body) = send(&routes, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token de acesso não fornecido");

    let (status, body) = send(&routes, get("/api/users/profile", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token inválido");
}

#[tokio::test]
async fn test_deactivated_account_is_rejected() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let request = warp::test::request()
        .method("DELETE")
        .path("/api/users/profile")
        .header("authorization", format!("Bearer {}", token));
    let (status, body) = send(&routes, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Conta desativada com sucesso!");

    let (status, body) = send(&routes, get("/api/auth/verify", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Conta de usuário desativada");

    let (status, _) = send(
        &routes,
        with_body(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "joao@x.com", "password": "senha123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(
        &routes,
        with_body(
            "PUT",
            "/api/users/profile",
            Some(&token),
            json!({"firstName": "Jô", "level": "intermediate", "isActive": false}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Perfil atualizado com sucesso!");
    assert_eq!(body["data"]["user"]["firstName"], "Jô");
    assert_eq!(body["data"]["user"]["level"], "intermediate");
    // Status is not self-service through the profile route
    assert_eq!(body["data"]["user"]["isActive"], true);

    let (status, _) = send(
        &routes,
        with_body("PUT", "/api/users/profile", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&routes, get("/api/users/profile/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "intermediate");
    assert_eq!(body["data"]["progress"]["totalLessons"], 0);
}

#[tokio::test]
async fn test_ownership_gate() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (joao_id, joao_token) = register(&routes, "joao", "joao@x.com").await;
    let (_, maria_token) = register(&routes, "maria", "maria@x.com").await;
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;

    let path = format!("/api/users/{}", joao_id);

    let (status, _) = send(&routes, get(&path, Some(&joao_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&routes, get(&path, Some(&maria_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Acesso negado a este recurso");

    let (status, body) = send(&routes, get(&path, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "joao");

    let progress_path = format!("/api/progress/user/{}", joao_id);
    let (status, _) = send(&routes, get(&progress_path, Some(&maria_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&routes, get(&progress_path, Some(&joao_token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tier_gate_on_level_route() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(&routes, get("/api/lessons/level/advanced", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Nível mínimo requerido: intermediate");

    let (status, body) =
        send(&routes, get("/api/lessons/level/intermediate", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = send(&routes, get("/api/lessons/level/expert", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&routes, get("/api/lessons/level/beginner", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tier_gate_on_study_sessions() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let (status, _) = send(
        &routes,
        get("/api/vocabulary/review/session?level=advanced", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &routes,
        get("/api/vocabulary/test/session?level=intermediate", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "intermediate");
    assert_eq!(body["data"]["category"], "mixed");
    assert!(!body["data"]["sessionId"].as_str().unwrap().is_empty());

    let (status, body) = send(&routes, get("/api/vocabulary/review/session", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "beginner");
}

#[tokio::test]
async fn test_admin_gate() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(&routes, get("/api/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Acesso negado. Requer privilégios de administrador"
    );

    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let (status, body) = send(&routes, get("/api/admin/stats", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 2);
}

#[tokio::test]
async fn test_lesson_catalogue() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let first = create_lesson(&routes, &admin_token, 1).await;
    let second = create_lesson(&routes, &admin_token, 2).await;

    let (status, body) = send(&routes, get("/api/lessons?limit=1&page=2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lessons"][0]["id"], second.as_str());
    assert_eq!(body["data"]["pagination"]["totalLessons"], 2);
    assert_eq!(body["data"]["pagination"]["hasPrevPage"], true);
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);

    let (status, body) = send(&routes, get(&format!("/api/lessons/{}/next", first), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], second.as_str());

    let (status, body) =
        send(&routes, get(&format!("/api/lessons/{}/previous", first), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Não há lição anterior disponível");

    let (status, body) = send(&routes, get("/api/lessons/does-not-exist", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lição não encontrada");

    let (status, _) = send(&routes, get("/api/lessons?level=expert", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&routes, get("/api/lessons/stats/overview", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);

    let request = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/admin/lessons/{}", second))
        .header("authorization", format!("Bearer {}", admin_token));
    let (status, body) = send(&routes, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lição desativada com sucesso!");

    let (status, _) = send(&routes, get(&format!("/api/lessons/{}", second), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lesson_pagination_bounds() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let first = create_lesson(&routes, &admin_token, 1).await;
    create_lesson(&routes, &admin_token, 2).await;

    let (status, body) = send(&routes, get("/api/lessons?page=0&limit=1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lessons"][0]["id"], first.as_str());
    assert_eq!(body["data"]["pagination"]["currentPage"], 1);
    assert_eq!(body["data"]["pagination"]["hasPrevPage"], false);

    let path = format!("/api/lessons?page={}&limit=2", usize::MAX);
    let (status, body) = send(&routes, get(&path, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lessons"], json!([]));
    assert_eq!(body["data"]["pagination"]["currentPage"], usize::MAX as u64);
    assert_eq!(body["data"]["pagination"]["totalLessons"], 2);
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
}

#[tokio::test]
async fn test_vocabulary_lookup() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let lesson = create_lesson(&routes, &admin_token, 1).await;

    let (status, body) = send(
        &routes,
        with_body(
            "POST",
            "/api/admin/vocabulary",
            Some(&admin_token),
            json!({
                "japanese": "こんにちは",
                "romaji": "konnichiwa",
                "portuguese": "olá",
                "lesson_id": lesson,
                "category": "greetings",
                "level": "beginner",
                "tags": ["saudação"],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let entry_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &routes,
        with_body(
            "POST",
            "/api/admin/vocabulary",
            Some(&admin_token),
            json!({
                "japanese": "こんにちは",
                "romaji": "konnichiwa",
                "portuguese": "olá",
                "lesson_id": lesson,
                "category": "greetings",
                "level": "beginner",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&routes, get(&format!("/api/lessons/{}", lesson), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["vocabulary"].as_array().unwrap().len(), 1);

    // "こん", percent-encoded
    let (status, body) = send(
        &routes,
        get("/api/vocabulary/search/%E3%81%93%E3%82%93", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["romaji"], "konnichiwa");

    let (status, body) = send(&routes, get("/api/vocabulary/category/greetings", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&routes, get(&format!("/api/vocabulary/{}", entry_id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["portuguese"], "olá");

    let (status, body) = send(&routes, get("/api/vocabulary/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Vocabulário não encontrado");

    let (status, body) = send(&routes, get("/api/vocabulary/random/practice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_progress_lifecycle() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let (_, token) = register(&routes, "joao", "joao@x.com").await;
    let lesson = create_lesson(&routes, &admin_token, 1).await;
    let lesson_path = format!("/api/progress/lesson/{}", lesson);

    // Completing a record that was never started
    let (status, body) = send(
        &routes,
        with_body("PUT", &format!("{}/complete", lesson_path), Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Progresso não encontrado para esta lição");

    let (status, body) = send(
        &routes,
        with_body("POST", &lesson_path, Some(&token), json!({"timeSpent": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Progresso iniciado com sucesso!");
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = send(
        &routes,
        with_body("POST", &lesson_path, Some(&token), json!({"notes": "revisar"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Progresso atualizado com sucesso!");
    assert_eq!(body["data"]["time_spent"], 60);

    let request = warp::test::request()
        .method("PUT")
        .path(&format!("{}/complete", lesson_path))
        .header("authorization", format!("Bearer {}", token));
    let (status, body) = send(&routes, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lição marcada como concluída!");
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["score"], 100);
    assert_eq!(body["data"]["attempts"], 1);
    assert!(!body["data"]["completed_at"].is_null());

    let (status, body) = send(
        &routes,
        with_body("PUT", &format!("{}/score", lesson_path), Some(&token), json!({"score": 150})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pontuação deve estar entre 0 e 100");

    let (status, body) = send(
        &routes,
        with_body("PUT", &format!("{}/score", lesson_path), Some(&token), json!({"score": 80})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 80);

    let (status, body) = send(
        &routes,
        with_body(
            "PUT",
            &format!("{}/favorite", lesson_path),
            Some(&token),
            json!({"favorite": "yes"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Campo favorite deve ser um booleano");

    let (status, body) = send(
        &routes,
        with_body(
            "PUT",
            &format!("{}/favorite", lesson_path),
            Some(&token),
            json!({"favorite": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lição marcada como favorita!");

    let (_, body) = send(&routes, get("/api/progress/favorites", Some(&token))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&routes, get("/api/progress/completed", Some(&token))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&routes, get("/api/progress/in-progress", Some(&token))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, body) = send(&routes, get("/api/progress/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completedLessons"], 1);

    let (status, body) = send(&routes, get("/api/progress/leaderboard", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["totalScore"], 80);
}

#[tokio::test]
async fn test_fractional_score_accepted_on_every_progress_route() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;
    let (_, token) = register(&routes, "joao", "joao@x.com").await;
    let lesson = create_lesson(&routes, &admin_token, 1).await;
    let record_path = format!("/api/progress/lesson/{}", lesson);
    let score_path = format!("/api/progress/lesson/{}/score", lesson);
    let complete_path = format!("/api/progress/lesson/{}/complete", lesson);

    let (status, body) = send(
        &routes,
        with_body("POST", &record_path, Some(&token), json!({"score": 150})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pontuação deve estar entre 0 e 100");

    let (status, body) = send(
        &routes,
        with_body("POST", &record_path, Some(&token), json!({"score": 87.5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["score"], 88);

    let (status, body) = send(
        &routes,
        with_body("PUT", &score_path, Some(&token), json!({"score": 150})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Pontuação deve estar entre 0 e 100");

    let (status, body) = send(
        &routes,
        with_body("PUT", &score_path, Some(&token), json!({"score": 72.4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 72);

    let (status, body) = send(
        &routes,
        with_body("POST", &record_path, Some(&token), json!({"score": 64.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 65);

    let (status, _) = send(
        &routes,
        with_body("PUT", &complete_path, Some(&token), json!({"score": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &routes,
        with_body("PUT", &complete_path, Some(&token), json!({"score": 99.6})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 100);
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn test_progress_requires_existing_lesson() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (_, token) = register(&routes, "joao", "joao@x.com").await;

    let (status, body) = send(
        &routes,
        with_body("POST", "/api/progress/lesson/nope", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lição não encontrada");
}

#[tokio::test]
async fn test_admin_collections() {
    let routes = routes(test_state(ServerConfig::for_testing()));
    let (joao_id, _) = register(&routes, "joao", "joao@x.com").await;
    let (_, admin_token) = register(&routes, "admin", "admin@nihongo.test").await;

    let (status, body) = send(&routes, get("/api/admin/collections", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (status, body) = send(
        &routes,
        get("/api/admin/collections/users?search=JOAO", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert!(body["data"]["documents"][0].get("passwordHash").is_none());

    let (status, body) = send(
        &routes,
        get(&format!("/api/admin/collections/users/{}", joao_id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "joao");

    let (status, body) =
        send(&routes, get("/api/admin/collections/secrets", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Coleção não encontrada");

    let (status, body) = send(
        &routes,
        get("/api/admin/collections/users/missing", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Documento não encontrado");
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let (status, body) = send(&routes, get("/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Rota não encontrada");

    let request = warp::test::request().method("DELETE").path("/api/auth/login");
    let (status, body) = send(&routes, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "Método não permitido");
}

#[tokio::test]
async fn test_status_endpoints_and_headers() {
    let routes = routes(test_state(ServerConfig::for_testing()));

    let response = warp::test::request().path("/").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["X-Frame-Options"], "DENY");
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "online");

    let (status, body) = send(&routes, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");

    let (status, body) = send(&routes, get("/api/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "1.0.0");

    let response = warp::test::request().path("/api/missing").reply(&routes).await;
    assert_eq!(response.headers()["X-Content-Type-Options"], "nosniff");
}

#[tokio::test]
async fn test_status_timestamps_follow_injected_clock() {
    let instant = Utc.with_ymd_and_hms(2025, 4, 1, 8, 30, 0).unwrap();
    let clock = ManualClock::new(instant);
    let routes = routes(test_state_with_clock(
        ServerConfig::for_testing(),
        Arc::new(clock.clone()),
    ));
    let expected = instant.to_rfc3339();

    for path in ["/", "/health", "/api/status"] {
        let (status, body) = send(&routes, get(path, None)).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert_eq!(body["timestamp"], expected.as_str(), "{}", path);
    }
}

#[tokio::test]
async fn test_rate_limit_on_api_prefix() {
    let mut config = ServerConfig::for_testing();
    config.rate_limit_max_requests = 2;
    let routes = routes(test_state(config));

    for _ in 0..2 {
        let (status, _) = send(&routes, get("/api/status", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&routes, get("/api/status", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["message"],
        "Muitas requisições deste IP, tente novamente mais tarde."
    );

    // Outside the API prefix the budget does not apply
    let (status, _) = send(&routes, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}
