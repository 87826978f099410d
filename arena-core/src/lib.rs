pub mod leaderboard;
pub mod live_state;
pub mod submission;

// Re-export main components
pub use leaderboard::*;
pub use live_state::*;
pub use submission::*;
