use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_tutor::{app, config, db, llm, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "course_tutor=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = config::load_settings();

  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");
  let provider = llm::provider_from_settings(&settings.llm).expect("Failed to create LLM client");
  tracing::info!(
    "Using {:?} scheduler (retention {})",
    settings.srs.scheduler,
    settings.srs.desired_retention
  );

  let state = AppState::new(pool, provider, settings.srs.clone());
  let app = app(state);

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", settings.server_port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
