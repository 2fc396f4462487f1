//! Tournament registry: announcement, lookup, prize pool and settlement state.
//!
//! The status guard in [`registry::finish`] is the linearization point for
//! settlement: of two concurrent finishers only one sees an open tournament.

pub mod models;
pub mod registry;

pub use models::{Tournament, TournamentId, TournamentStatus};
pub use registry::{
    announce, assign_winner, finish, get, get_for_update, list_finished, set_prize_pool,
};
