pub use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use rayon::prelude::*;
pub use clap::{Parser, ValueEnum};
pub use tracing::{debug, info, warn};

pub use crate::{
    ResourceState,
    algo::{check_safety, request::request_allocation},
    analyze::{analyze, Analysis, Recommendation},
    sim::{Simulation, SimConfig, Speed, StepEvent, StepReport, SurveyReport, survey},
};

/// The unit for counting resource instances. Stored values are never
/// negative; the type is signed so that bad input can be reported as
/// [`BankerError::NegativeValue`] instead of wrapping around.
pub type Units = i64;

/// A P×R table of [`Units`], one row per process.
pub type Matrix = Vec<Vec<Units>>;

/// Names one of the numeric structures, so that errors can
/// point at the exact offending cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Maximum,
    Allocation,
    Available,
    Request,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Maximum      => "maximum",
            Field::Allocation   => "allocation",
            Field::Available    => "available",
            Field::Request      => "request",
        };
        f.write_str(name)
    }
}

/// Which dimension an out-of-range index (or length) was checked against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Process,
    Resource,
    /// The number of entries in a request vector, which must be `R`.
    RequestLength,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Process       => f.write_str("process index"),
            Axis::Resource      => f.write_str("resource index"),
            Axis::RequestLength => f.write_str("request length"),
        }
    }
}

/// Caller mistakes and protocol violations. Whenever one of these is
/// returned, the [`ResourceState`] it concerns has not been touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankerError {
    #[error("{axis} {index} is out of range (limit {len})")]
    OutOfRange {
        axis:       Axis,
        index:      usize,
        len:        usize,
    },
    #[error("negative value {value} for {field} cell (process {process:?}, resource {resource})")]
    NegativeValue {
        field:      Field,
        process:    Option<usize>,
        resource:   usize,
        value:      Units,
    },
    #[error("{field} has {found} entries, expected {expected}")]
    DimensionMismatch {
        field:      Field,
        expected:   usize,
        found:      usize,
    },
    #[error("P{process} requested {requested} of R{resource} but only needs {need}")]
    ExceedsNeed {
        process:    usize,
        resource:   usize,
        requested:  Units,
        need:       Units,
    },
    #[error("P{process} would hold {allocation} of R{resource}, above its maximum claim of {maximum}")]
    InvariantViolation {
        process:    usize,
        resource:   usize,
        allocation: Units,
        maximum:    Units,
    },
    #[error("R{resource} accounts for {found} units, total capacity is {expected}")]
    CapacityMismatch {
        resource:   usize,
        expected:   Units,
        found:      Units,
    },
    #[error("R{resource} holds more units in total than can be counted")]
    CapacityOverflow {
        resource:   usize,
    },
}

/// Why a well-formed request could not be granted right now.
///
/// Neither case is a fault: the requesting process is expected
/// to wait and try again later, or ask for less.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// Not enough free units of `resource` at the moment.
    ExceedsAvailable {
        resource:   usize,
        requested:  Units,
        available:  Units,
    },
    /// The units exist, but handing them out would leave the
    /// system in an unsafe state.
    WouldDeadlock,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::ExceedsAvailable { resource, requested, available } => write!(
                f,
                "requested {} of R{} but only {} available",
                requested, resource, available
            ),
            Refusal::WouldDeadlock => f.write_str("granting would lead to an unsafe state"),
        }
    }
}

/// The three-way answer of [`request_allocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request was committed. `order` is a safe sequence
    /// of the new state.
    Granted { order: Vec<usize> },
    /// The request was well-formed but refused; state unchanged.
    Denied(Refusal),
    /// The request broke the model's contract; state unchanged.
    Rejected(BankerError),
}

impl RequestOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, RequestOutcome::Granted { .. })
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOutcome::Granted { order } => write!(f, "granted, safe sequence {}", render_order(order)),
            RequestOutcome::Denied(r)   => write!(f, "denied: {}", r),
            RequestOutcome::Rejected(e) => write!(f, "rejected: {}", e),
        }
    }
}

/// Output of [`check_safety`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyReport {
    pub is_safe:    bool,
    /// Processes in the order they could finish. When the state is
    /// unsafe this is only the prefix found before the algorithm stalled,
    /// so always look at `is_safe` rather than at the length.
    pub order:      Vec<usize>,
    pub processes:  usize,
}

impl SafetyReport {
    /// Processes that could not be admitted, in ascending index order.
    /// Empty iff the state is safe.
    pub fn stalled(&self) -> Vec<usize> {
        let mut admitted = vec![false; self.processes];
        for &i in &self.order {
            admitted[i] = true;
        }
        (0..self.processes)
            .filter(|&i| !admitted[i])
            .collect()
    }
}

impl fmt::Display for SafetyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_order(&self.order))
    }
}

/// Renders a process sequence as `P1 → P3 → P0`.
pub fn render_order(order: &[usize]) -> String {
    if order.is_empty() {
        return String::from("(none)");
    }
    order.iter()
        .map(|i| format!("P{}", i))
        .join(" → ")
}

/// A by-value copy of all four structures of a [`ResourceState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub maximum:    Matrix,
    pub allocation: Matrix,
    pub need:       Matrix,
    pub available:  Vec<Units>,
}

//---START COMMAND-LINE INPUT
// Textual forms of vectors and matrices accepted by the binaries.
// A vector is comma-separated ("3,3,2"), a matrix is a
// semicolon-separated list of vectors ("7,5,3;3,2,2").

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not parse `{0}` as a unit count")]
    BadNumber(String),
    #[error("expected `<process>:<units>`, got `{0}`")]
    BadRequest(String),
}

/// A comma-separated vector of [`Units`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitVec(pub Vec<Units>);

impl FromStr for UnitVec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(UnitVec(vec![]));
        }
        s.split(',')
            .map(|tok| {
                let tok = tok.trim();
                tok.parse::<Units>()
                    .map_err(|_| ParseError::BadNumber(tok.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(UnitVec)
    }
}

/// A semicolon-separated list of [`UnitVec`] rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMatrix(pub Matrix);

impl FromStr for UnitMatrix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(UnitMatrix(vec![]));
        }
        s.split(';')
            .map(|row| row.parse::<UnitVec>().map(|v| v.0))
            .collect::<Result<Matrix, _>>()
            .map(UnitMatrix)
    }
}

/// A single request, written `<process>:<units>`, e.g. `1:1,0,2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub process:    usize,
    pub units:      Vec<Units>,
}

impl FromStr for ProcessRequest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (who, what) = s.split_once(':')
            .ok_or_else(|| ParseError::BadRequest(s.to_string()))?;
        let process = who.trim()
            .trim_start_matches(['P', 'p'])
            .parse::<usize>()
            .map_err(|_| ParseError::BadRequest(s.to_string()))?;

        Ok(ProcessRequest {
            process,
            units: what.parse::<UnitVec>()?.0,
        })
    }
}
//---END COMMAND-LINE INPUT

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vectors_and_matrices() {
        assert_eq!("3, 3,2".parse::<UnitVec>().unwrap(), UnitVec(vec![3, 3, 2]));
        assert_eq!("".parse::<UnitVec>().unwrap(), UnitVec(vec![]));
        assert_eq!(
            "7,5,3;3,2,2".parse::<UnitMatrix>().unwrap(),
            UnitMatrix(vec![vec![7, 5, 3], vec![3, 2, 2]])
        );
        assert_eq!(
            "1,x".parse::<UnitVec>(),
            Err(ParseError::BadNumber(String::from("x")))
        );
    }

    #[test]
    fn parses_requests() {
        let r: ProcessRequest = "P1:1,0,2".parse().unwrap();
        assert_eq!(r.process, 1);
        assert_eq!(r.units, vec![1, 0, 2]);
        assert!("1,0,2".parse::<ProcessRequest>().is_err());
    }

    #[test]
    fn stalled_is_complement_of_order() {
        let report = SafetyReport {
            is_safe:    false,
            order:      vec![3, 1],
            processes:  5,
        };
        assert_eq!(report.stalled(), vec![0, 2, 4]);
        assert_eq!(report.to_string(), "P3 → P1");
    }
}
