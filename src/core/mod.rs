pub mod aggregator;
pub mod auth;
pub mod commands;
pub mod cv_text;
pub mod errors;
pub mod export_sink;
pub mod field_extractor;
pub mod google_drive;
pub mod models;
pub mod pdf;
pub mod pdf_downloader;
pub mod queries;
pub mod search_client;
pub mod service;
pub mod settings_store;
pub mod typesense;
