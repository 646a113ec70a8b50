//! # API Route Modules
//!
//! - `acord`: `POST|PUT /acord/{kind}`, ACORD transaction dispatch.

pub mod acord;
