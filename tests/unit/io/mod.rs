pub mod cli;
pub mod configuration;
pub mod encoder;
pub mod faces;
