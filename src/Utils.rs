//! different utility modules used throughout the project
/// logger setup and saving of sampled fields to csv
pub mod logger;
/// heat map of a sampled potential
pub mod plots;
