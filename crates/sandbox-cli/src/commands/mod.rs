//! One module per CLI subcommand, mirroring `commands/`'s directory-of-files
//! layout: most files expose a single `pub async fn execute(...)`.

pub mod analyze;
pub mod lifecycle;
pub mod logs;
pub mod review;
pub mod serve;
pub mod status;
pub mod upload;
