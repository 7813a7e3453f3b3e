pub mod collection;
pub mod extraction_job;
pub mod job;
