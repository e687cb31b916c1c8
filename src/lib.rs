pub mod application;
pub mod domain;
pub mod infrastructures;

mod test_utils;
