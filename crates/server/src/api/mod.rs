pub mod handlers;
pub mod info;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
