pub mod board;

pub use board::BoardScreen;
