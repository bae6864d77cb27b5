pub mod config;
pub mod daemon;
pub mod helpers;
pub mod init;
pub mod observe;
pub mod report;
pub mod results;
pub mod tab;
