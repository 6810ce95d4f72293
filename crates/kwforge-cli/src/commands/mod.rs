pub mod build;
pub mod list;
pub mod schema;
pub mod validate;
