//! Subcommand implementations.

pub(crate) mod serve;
pub(crate) mod verify;
