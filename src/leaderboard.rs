pub mod board;
pub mod entry;
pub mod service;

pub use board::Leaderboard;
pub use entry::{ScoreEntry, Submission};
pub use service::LeaderboardService;
