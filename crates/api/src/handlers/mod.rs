pub mod jobs;
pub mod status;
