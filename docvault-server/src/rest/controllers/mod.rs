pub mod collections;
pub mod documents;
pub mod query;
pub mod tokens;
