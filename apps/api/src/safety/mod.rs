pub mod bias;
pub mod fabrication;
pub mod output_sanitize;
pub mod patterns;
pub mod sanitize;
pub mod types;
