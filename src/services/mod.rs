pub mod chart;
pub mod ingest;
pub mod report;
pub mod store;
pub mod table;
