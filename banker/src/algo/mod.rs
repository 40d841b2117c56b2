pub mod request;

use crate::helpe::*;

/// Runs the Banker's safety check on `state`.
///
/// Starting from `work = Available`, passes are made over the
/// unfinished processes in ascending index order. *Every* process whose
/// need fits into `work` is admitted within the same pass, its
/// allocation returning to `work` immediately, before the next pass
/// starts. Scanning stops when all processes are in, or when a whole
/// pass admits nobody.
///
/// The admission order is thus fully determined by the input; the same
/// state always yields the same `order`.
///
/// Worst case is `P` passes over `P` processes over `R` resources.
pub fn check_safety(state: &ResourceState) -> SafetyReport {
    let p = state.processes();
    let allocation = state.allocation();
    let mut work: Vec<Units> = state.available().to_vec();
    let mut finished = vec![false; p];
    let mut order = Vec::with_capacity(p);
    let mut passes = 0;

    loop {
        let mut progress = false;
        for i in 0..p {
            if finished[i] { continue; }
            let need = state.need_row(i);
            debug_assert!(need.iter().all(|&n| n >= 0), "Negative need for P{}", i);
            if fits(need, &work) {
                // A saturated pool still covers any need.
                for (w, &a) in work.iter_mut().zip(&allocation[i]) {
                    *w = w.saturating_add(a);
                }
                finished[i] = true;
                order.push(i);
                progress = true;
            }
        }
        passes += 1;
        if !progress || order.len() == p { break; }
    }

    let is_safe = order.len() == p;
    debug!(is_safe, passes, order = %render_order(&order), "safety check done");

    SafetyReport {
        is_safe,
        order,
        processes: p,
    }
}

/// Returns `true` if `need` can be satisfied out of `work`,
/// resource by resource.
#[inline(always)]
pub fn fits(need: &[Units], work: &[Units]) -> bool {
    need.iter()
        .zip(work)
        .all(|(n, w)| n <= w)
}
