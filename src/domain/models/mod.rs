pub mod growth;
pub mod repository;
