// Per-student list of universities, optionally annotated with fit results.

pub mod handlers;
pub mod repository;
