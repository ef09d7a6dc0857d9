pub mod cli;
pub mod server;
pub mod tether;

pub use server::{AppState, router};
pub use tether::{Session, Tether};
