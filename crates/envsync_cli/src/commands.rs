//! Command modules for the envsync CLI.
//!
//! - `sync_cmd`: reconciles the environments of one repository with a settings file

pub mod sync_cmd;
