pub mod alerts;
pub mod pipeline;
pub mod regime;
pub mod reporting;
pub mod signal;

#[cfg(test)]
mod alerts_tests;
#[cfg(test)]
mod regime_tests;
