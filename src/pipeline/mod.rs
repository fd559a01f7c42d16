// src/pipeline/mod.rs

//! The result pipeline: raw scraper rows in, a stable, filterable,
//! paginated feed out.
//!
//! Stages:
//! 1. `normalize` - heterogeneous rows become canonical [`JobRecord`]s,
//!    duplicates removed within the batch.
//! 2. `filter` - user-side post-filters and sort orders.
//! 3. `session` - a growable working set with on-demand pagination.
//!
//! [`JobRecord`]: crate::models::JobRecord

mod filter;
mod normalize;
mod session;

pub use filter::{annual_amount, apply_filters, sort_rows, PostFilters, SortOrder};
pub use normalize::{dedupe, normalize, normalize_row};
pub use session::{PageOutcome, SearchSession};
