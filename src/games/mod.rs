//! Game catalogue and the controller that plays them

pub mod bubbles;
pub mod controller;
pub mod crash;
pub mod dice;
pub mod keno;
pub mod mines;
pub mod session;
pub mod tower;
pub mod types;
pub mod x100;

pub use controller::{GameController, SessionState};
pub use types::*;
