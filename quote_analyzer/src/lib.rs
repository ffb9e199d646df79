//! Historical daily quote assembly and Bollinger Band analysis for US equities.
//!
//! The pipeline is: a [`providers::PageSource`] serves overlapping pages of
//! daily records, the [`assembler::SeriesAssembler`] stitches them into one
//! chronological [`models::series::Series`], a [`container::SeriesContainer`]
//! validates the columns, and [`indicators::bollinger_bands`] computes the
//! bands. [`screener`] runs that pipeline over many symbols.

pub mod assembler;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod container;
pub mod errors;
pub mod indicators;
pub mod models;
pub mod providers;
pub mod screener;

pub use errors::{Error, Result};
