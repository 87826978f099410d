pub mod prelude;
pub mod scores;
pub mod users;
