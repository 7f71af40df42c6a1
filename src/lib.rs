pub mod aggregate;
pub mod archive;
pub mod biosample;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod geo;
pub mod http;
pub mod ncbi;
pub mod output;
pub mod tabular;
