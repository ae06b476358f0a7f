pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod schema;
pub mod state;
pub mod sync;
pub mod workers;

pub use routes::create_router;
pub use workers::{default_handlers, JobExecution, JobHandler, Scheduler, Worker};
