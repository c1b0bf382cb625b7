//! CLI subcommands.
//!
//! Each command loads the snapshots it needs through a [`Runtime`](crate::runtime::Runtime),
//! calls into the registry functions and prints the result.

pub mod config;
mod list;
mod outdated;
mod show;
mod upgrade;

pub use config::{Config, UpgradeOptions};
pub use list::list;
pub use outdated::outdated;
pub use show::show;
pub use upgrade::upgrade;
