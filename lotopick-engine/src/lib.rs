pub mod config;
pub mod correlation;
pub mod generator;
pub mod history;
pub mod popularity;
pub mod sequence;
pub mod source;
