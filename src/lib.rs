pub mod cli;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod server;
pub mod storage;
pub mod worker;
