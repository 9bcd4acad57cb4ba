//! Command implementations for janitor-cli

pub mod init;
pub mod run;
pub mod scan;
pub mod watch;

pub use init::run_init;
pub use run::run_repair;
pub use scan::run_scan;
pub use watch::run_watch;
