//! Helpers shared across layers.

pub mod db_error;
pub mod url_normalizer;
