//! Command implementations, one module per subcommand.

pub mod add;
pub mod check;
pub mod cleanup;
pub mod create;
pub mod list;
pub mod prune;
pub mod remove;
pub mod retrieve;
