mod env;
mod global_state;
mod response;
mod routes;
mod utils;

pub use routes::{chat_routes, misc_routes, respond_routes};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use response::AppError;
pub use utils::setup_tracing;
