// Service-side state: job lifecycle records and the record upsert sink.

pub mod records;
pub mod status;
