mod app;
mod drain;

pub use app::{app, AppState};
pub use drain::DrainError;
