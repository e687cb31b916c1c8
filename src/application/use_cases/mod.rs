pub mod build_growth_report;
pub mod collect_repository_info;
pub mod fetch_repository_info;
