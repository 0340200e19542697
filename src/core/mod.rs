//! Core conversion logic and abstractions

pub mod config;
pub mod conversion;
pub mod converter;
pub mod currency;
pub mod log;

// Re-export main types for cleaner imports
pub use conversion::Conversion;
pub use converter::{Change, Converter, ConverterState};
pub use currency::{CurrencyCode, CurrencyRateProvider, RateTable};
