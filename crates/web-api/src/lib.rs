pub mod handlers;
pub mod server;

pub use handlers::RefreshResponse;
pub use server::ApiServer;
