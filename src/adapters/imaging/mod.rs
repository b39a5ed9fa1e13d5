pub mod annotate;
pub mod ingest;
