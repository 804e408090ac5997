//! Validation module for cached price data.
//!
//! Checks stored bars for ordering, value ranges, OHLC consistency and
//! calendar gaps before they feed an analysis.

pub mod data_integrity;

pub use data_integrity::{
    CheckResult, DataIntegrityReport, DataIntegrityValidator, ValidationError, ValidationResult,
    DEFAULT_MAX_GAP_DAYS,
};
