// College fit: weighted rubric scoring of a student profile against a
// university, with results cached in Redis per profile/university version.

pub mod cache;
pub mod handlers;
pub mod scoring;
