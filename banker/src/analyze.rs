use crate::helpe::*;

/// Resources whose utilization is strictly above this fraction
/// are reported as bottlenecks.
pub const BOTTLENECK_THRESHOLD: f64 = 0.8;

/// Advisory read-out of a [`ResourceState`].
///
/// The verdict and sequence are those of [`check_safety`]; everything
/// else is a heuristic meant to help a human decide what to change.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub safety:             SafetyReport,
    /// Allocated / (allocated + available), per resource type.
    pub utilization:        Vec<f64>,
    pub bottlenecks:        Vec<usize>,
    /// Higher means "cheaper to serve", per process.
    pub priorities:         Vec<f64>,
    /// Process indices by descending priority.
    pub ranking:            Vec<usize>,
    /// Empty when the state is safe.
    pub recommendations:    Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// The process could not be admitted; its claims deserve a look.
    ReviewRequests { process: usize },
    /// The resource type is nearly exhausted.
    IncreaseResource { resource: usize, utilization: f64 },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::ReviewRequests { process } => write!(
                f,
                "review resource requests of P{}: its remaining need may lead to deadlock",
                process
            ),
            Recommendation::IncreaseResource { resource, utilization } => write!(
                f,
                "increase R{}: {:.2}% of it is allocated",
                resource,
                utilization * 100.0
            ),
        }
    }
}

/// Builds an [`Analysis`] of `state`.
///
/// A process's priority adds up, over all resource types `j`:
///
/// - `-2` if `j` is a bottleneck and the process still needs some of it,
/// - `1 - Need[i][j] / total[j]`,
/// - `1 - Allocation[i][j] / total[j]`,
///
/// where `total[j]` is allocated plus available units. Resource types
/// with no units at all contribute ratios of zero. Fails only when some
/// `total[j]` cannot be counted ([`BankerError::CapacityOverflow`]).
pub fn analyze(state: &ResourceState) -> Result<Analysis, BankerError> {
    let safety = check_safety(state);
    let total = state.total_capacity()?;
    let ratio = |v: Units, j: usize| -> f64 {
        if total[j] == 0 { 0.0 } else { v as f64 / total[j] as f64 }
    };

    let utilization: Vec<f64> = total.iter()
        .zip(state.available())
        .enumerate()
        .map(|(j, (&t, &a))| ratio(t - a, j))
        .collect();
    let bottlenecks: Vec<usize> = utilization.iter()
        .positions(|&u| u > BOTTLENECK_THRESHOLD)
        .collect();

    let priorities: Vec<f64> = (0..state.processes())
        .map(|i| {
            let need = state.need_row(i);
            let held = &state.allocation()[i];
            (0..state.resources()).fold(0.0, |score, j| {
                let penalty = if need[j] > 0 && bottlenecks.contains(&j) { -2.0 } else { 0.0 };
                score + penalty + (1.0 - ratio(need[j], j)) + (1.0 - ratio(held[j], j))
            })
        })
        .collect();
    // Stable sort: equal scores keep ascending index order.
    let ranking: Vec<usize> = (0..state.processes())
        .sorted_by(|&a, &b| priorities[b].total_cmp(&priorities[a]))
        .collect();

    let recommendations = if safety.is_safe {
        vec![]
    } else {
        safety.stalled()
            .into_iter()
            .map(|process| Recommendation::ReviewRequests { process })
            .chain(bottlenecks.iter().map(|&resource| Recommendation::IncreaseResource {
                resource,
                utilization: utilization[resource],
            }))
            .collect()
    };
    debug!(bottlenecks = ?bottlenecks, ranking = ?ranking, "analysis done");

    Ok(Analysis {
        safety,
        utilization,
        bottlenecks,
        priorities,
        ranking,
        recommendations,
    })
}
