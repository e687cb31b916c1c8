pub mod json_result_cache;
pub mod report_file;
pub mod star_events_file;
