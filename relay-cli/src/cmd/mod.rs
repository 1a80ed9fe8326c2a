pub mod config;
pub mod execute;
pub mod render;
pub mod validate;
