pub mod find;
pub mod store;
