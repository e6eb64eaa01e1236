pub mod config;
pub mod detect;
pub mod errors;
pub mod leak;
pub mod measure;
pub mod model;
pub mod probe;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod smoke;
pub mod stability;
