//! Welcome to `banker`!
//!
//! A resource-allocation model and the Banker's Algorithm for
//! deadlock avoidance, evaluated over inert numeric processes.

mod state;

pub mod algo;
pub mod analyze;
pub mod sim;
pub mod helpe;

pub use crate::helpe::*;

/// The allocation state of `P` processes competing for `R` resource
/// types. Four structures are kept side by side:
///
/// 1. *Maximum*: the most units of each type that a process declares
///     it may ever hold at once.
/// 2. *Allocation*: the units each process holds right now.
/// 3. *Need*: `Maximum - Allocation`. Derived; there is no setter.
/// 4. *Available*: the units of each type that nobody holds.
///
/// Every mutator validates its input before touching anything, so
/// the following hold at all times:
///
/// - all cells are non-negative,
/// - no process holds more than its maximum claim,
/// - [`need`](ResourceState::need) agrees with the other two matrices.
///
/// > ***NOTE:*** Conservation of units (allocated plus available equals
/// > the installed capacity) is the caller's business. It is only checked
/// > on demand, via [`check_capacity`](ResourceState::check_capacity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    processes:  usize,
    resources:  usize,
    maximum:    Matrix,
    allocation: Matrix,
    // Kept in lockstep with the two matrices above, row by row.
    need:       Matrix,
    available:  Vec<Units>,
}
