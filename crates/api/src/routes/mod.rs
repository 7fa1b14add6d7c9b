mod chat;
mod misc;
mod respond;

pub use chat::chat_routes;
pub use misc::misc_routes;
pub use respond::respond_routes;
