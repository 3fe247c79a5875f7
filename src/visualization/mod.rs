//! Chart generation for the dashboard.

pub mod plotter;
pub mod sunburst;

pub use plotter::{PlotError, Plotter};
