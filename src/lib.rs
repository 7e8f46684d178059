pub mod analyze;
pub mod cli;
pub mod error;
pub mod model;
pub mod parsers;
pub mod report;
pub mod sources;
pub mod suggest;
