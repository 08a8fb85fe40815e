pub mod config;
pub mod db;
pub mod enqueue;
pub mod init;
pub mod list;
pub mod log;
pub mod status;
pub mod sync;
pub mod watch;
