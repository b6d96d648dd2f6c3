//! Keeps a poll detail view in sync with a reactive poll repository.
//!
//! The controller resolves the poll from the route, follows its updates, waits
//! for the separately loaded options, projects chart and per-voter data and
//! coordinates confirmed delete / anonymize requests.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod route;
pub mod services;
pub mod tasks;
pub mod voting;

pub use config::DetailConfig;
pub use error::PollError;
pub use handlers::{MutationOutcome, PollDetail, PollDetailController, PollVariant, Services};
pub use route::RouteSnapshot;
