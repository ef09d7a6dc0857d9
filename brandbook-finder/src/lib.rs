//! Company website discovery.
//!
//! [`scorer`] ranks raw search results with fixed heuristics;
//! [`resolver`] runs a battery of searches through a
//! [`SearchProvider`](brandbook_web::SearchProvider), scores them and falls
//! back to asking the session's model.

pub mod resolver;
pub mod scorer;

pub use resolver::{SearchBattery, SearchQuery, UrlResolver, post_process_answer, query_battery};
pub use scorer::{DENYLIST, ScoredCandidate, rank, score_and_select};
