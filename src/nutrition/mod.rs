pub mod catalog;
pub mod types;

pub use types::{AnalysisDetails, AnalysisEstimate, FoodLogEntry, LogMethod, NewFoodLogEntry};
