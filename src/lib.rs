pub mod config;
pub mod csv_selection;
pub mod decoder;
pub mod extractor;
pub mod models;
pub mod output;
pub mod transport;
pub mod tree;
