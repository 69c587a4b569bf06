pub mod ingest;
pub mod preprocess;
pub mod report;
pub mod scoring;
pub mod settings;
