use axum::Router;

pub async fn create_test_app() -> Router {
    std::env::set_var("APP_ENV", "test");
    std::env::set_var("DATABASE_URL", "");
    std::env::set_var("LLM_MOCK", "1");

    notewise_backend_rust::create_app().await
}
