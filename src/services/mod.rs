// src/services/mod.rs

//! Clients for the external collaborators: the job scraper service and the
//! exchange rate service.

pub mod fx;
pub mod scraper;

pub use fx::FxClient;
pub use scraper::{HttpJobSearch, JobSearchClient, RawJobRow};
