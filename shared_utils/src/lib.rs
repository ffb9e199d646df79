//! Small helpers shared across the workspace: environment lookup and the
//! compact `YYYYMMDD` date format used by the quote API.

pub mod dates;
pub mod env;
