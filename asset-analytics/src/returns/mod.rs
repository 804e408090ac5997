//! Returns transforms.
//!
//! - Arithmetic and log returns from prices
//! - Cumulative growth of $1 from returns

pub mod transform;

pub use transform::{
    arithmetic_returns, cumulative_returns, log_returns, CumulativeReturns, ReturnKind,
    ReturnSeries,
};
