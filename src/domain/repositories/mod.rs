pub mod result_cache;
pub mod star_events;
