pub mod backfill;
pub mod completion;
pub mod init;
pub mod progress;
pub mod workflow;
