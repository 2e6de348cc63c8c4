pub mod callbacks;

pub use callbacks::{router, AppState};
