pub mod advisory;
pub mod detection;
pub mod errors;
pub mod pixels;
pub mod model;
pub mod severity;
