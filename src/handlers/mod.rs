//! CLI glue: one handler per subcommand.

pub mod batch;
pub mod extract;
pub mod init;
pub mod plan;
pub mod run;
