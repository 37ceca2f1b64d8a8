// Business domains
pub mod refresh;
