//! The demonstration endpoints. Thin by design; their contract with the
//! dispatcher and codec is the interesting part.

pub mod create_person;
pub mod fetch_person;
pub mod fetch_user_by_id;
pub mod hello;
pub mod types;
