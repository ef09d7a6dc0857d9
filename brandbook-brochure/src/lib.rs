//! Brochure generation on top of the model gateway and the page fetcher.

pub mod composer;
pub mod prompts;

pub use composer::{BrochureComposer, Link, LinkSelection, assemble_document};
