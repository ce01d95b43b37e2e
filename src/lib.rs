//! Crossword filling as a constraint satisfaction problem: node and arc consistency over
//! per-slot word domains, followed by backtracking search with MRV/degree variable ordering,
//! least-constraining-value ordering, and optional maintained arc consistency.

pub mod arc_consistency;
pub mod assignment;
pub mod backtracking_search;
pub mod domains;
pub mod grid_config;
pub mod render;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

pub use assignment::Assignment;
pub use backtracking_search::{find_fill, solve, FillFailure, FillOptions, FillSuccess, Statistics};
pub use grid_config::{Direction, GridConfig, PuzzleError, Variable, VariableId, WordId};
pub use render::{render_grid, save_image};
