pub mod app;
pub mod http;
pub mod hub;
pub mod ingest;
pub mod ws;
