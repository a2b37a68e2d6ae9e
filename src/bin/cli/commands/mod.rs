pub mod curve;
pub mod estimate;
pub mod practice;
pub mod status;
