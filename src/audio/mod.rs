pub mod advanced;
pub mod analysis;
pub mod features;
pub mod source;
