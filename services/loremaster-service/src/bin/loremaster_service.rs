use anyhow::Result;
use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use loremaster_common::EnvVars;
use loremaster_service_api::{
    chat_routes, misc_routes, respond_routes, setup_tracing, ApiServerEnv, GlobalState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let cors = CorsLayer::very_permissive();
    let trace = TraceLayer::new_for_http();

    let state = GlobalState::new().await?;

    let app = Router::new()
        .merge(misc_routes())
        .merge(respond_routes())
        .merge(chat_routes())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(300)))
        .layer(cors)
        .layer(trace)
        .with_state(state);

    let env = ApiServerEnv::load();
    let port: u16 = env.port
        .parse()
        .expect("failed to convert to number");

    let listener = tokio::net::TcpListener::bind(format!(":::{port}")).await?;

    tracing::info!("LISTENING ON {port}");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
