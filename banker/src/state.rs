use crate::helpe::*;

/// What [`ResourceState::grant`] overwrote, so that
/// [`ResourceState::restore`] can put it back exactly.
pub(crate) struct Checkpoint {
    process:        usize,
    allocation_row: Vec<Units>,
    available:      Vec<Units>,
}

impl ResourceState {
    /// Creates an all-zero state for `p` processes and `r` resource types.
    pub fn new(p: usize, r: usize) -> Self {
        Self {
            processes:  p,
            resources:  r,
            maximum:    vec![vec![0; r]; p],
            allocation: vec![vec![0; r]; p],
            need:       vec![vec![0; r]; p],
            available:  vec![0; r],
        }
    }

    /// Builds a state out of complete matrices. `P` is taken from
    /// `maximum`, `R` from `available`.
    ///
    /// All cells go through the regular setters, so a successfully
    /// returned state satisfies every invariant. Ragged or mis-sized
    /// input is reported as [`BankerError::DimensionMismatch`].
    pub fn from_matrices(
        maximum:    Matrix,
        allocation: Matrix,
        available:  Vec<Units>,
    ) -> Result<Self, BankerError> {
        let (p, r) = (maximum.len(), available.len());
        if allocation.len() != p {
            return Err(BankerError::DimensionMismatch {
                field:      Field::Allocation,
                expected:   p,
                found:      allocation.len(),
            });
        }
        for (field, m) in [(Field::Maximum, &maximum), (Field::Allocation, &allocation)] {
            if let Some(row) = m.iter().find(|row| row.len() != r) {
                return Err(BankerError::DimensionMismatch {
                    field,
                    expected:   r,
                    found:      row.len(),
                });
            }
        }

        let mut res = Self::new(p, r);
        for (j, &v) in available.iter().enumerate() {
            res.set_available(j, v)?;
        }
        // Maximum first: allocations are checked against it.
        for (i, row) in maximum.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                res.set_maximum(i, j, v)?;
            }
        }
        for (i, row) in allocation.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                res.set_allocation(i, j, v)?;
            }
        }

        Ok(res)
    }

    /// Throws everything away and starts over with `p` processes and
    /// `r` resource types, all zero. Values are not carried over.
    pub fn resize(&mut self, p: usize, r: usize) {
        *self = Self::new(p, r);
    }

    pub fn processes(&self) -> usize {
        self.processes
    }

    pub fn resources(&self) -> usize {
        self.resources
    }

    pub fn maximum(&self) -> &[Vec<Units>] {
        &self.maximum
    }

    pub fn allocation(&self) -> &[Vec<Units>] {
        &self.allocation
    }

    pub fn available(&self) -> &[Units] {
        &self.available
    }

    /// Borrows the need row of process `i`.
    ///
    /// Panics if `i` is out of range.
    pub fn need_row(&self, i: usize) -> &[Units] {
        &self.need[i]
    }

    /// Returns a copy of the Need matrix.
    pub fn need(&self) -> Matrix {
        self.need.clone()
    }

    /// Returns a copy of all four structures.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            maximum:    self.maximum.clone(),
            allocation: self.allocation.clone(),
            need:       self.need.clone(),
            available:  self.available.clone(),
        }
    }

    /// Sets the maximum claim of process `i` on resource `j`.
    ///
    /// Lowering a claim below what the process already holds is
    /// a [`BankerError::InvariantViolation`].
    pub fn set_maximum(&mut self, i: usize, j: usize, v: Units) -> Result<(), BankerError> {
        self.check_cell(i, j)?;
        check_value(Field::Maximum, Some(i), j, v)?;
        let held = self.allocation[i][j];
        if held > v {
            return Err(BankerError::InvariantViolation {
                process:    i,
                resource:   j,
                allocation: held,
                maximum:    v,
            });
        }
        self.maximum[i][j] = v;
        self.refresh_need(i);

        Ok(())
    }

    /// Sets how many units of resource `j` process `i` holds.
    ///
    /// Going above the maximum claim is a [`BankerError::InvariantViolation`].
    /// Available is left alone: moving units between the pool and the
    /// processes is up to the caller (or to [`request_allocation`]).
    pub fn set_allocation(&mut self, i: usize, j: usize, v: Units) -> Result<(), BankerError> {
        self.check_cell(i, j)?;
        check_value(Field::Allocation, Some(i), j, v)?;
        let claim = self.maximum[i][j];
        if v > claim {
            return Err(BankerError::InvariantViolation {
                process:    i,
                resource:   j,
                allocation: v,
                maximum:    claim,
            });
        }
        self.allocation[i][j] = v;
        self.refresh_need(i);

        Ok(())
    }

    /// Sets the free units of resource `j`.
    pub fn set_available(&mut self, j: usize, v: Units) -> Result<(), BankerError> {
        self.check_resource(j)?;
        check_value(Field::Available, None, j, v)?;
        self.available[j] = v;

        Ok(())
    }

    /// Allocated plus available units, per resource type.
    ///
    /// Every cell may be as large as [`Units::MAX`], so a column can add up
    /// to more than fits; that is a [`BankerError::CapacityOverflow`].
    pub fn total_capacity(&self) -> Result<Vec<Units>, BankerError> {
        (0..self.resources)
            .map(|j| {
                self.allocation.iter()
                    .try_fold(self.available[j], |acc, row| acc.checked_add(row[j]))
                    .ok_or(BankerError::CapacityOverflow { resource: j })
            })
            .collect()
    }

    /// Checks the conservation law against the installed capacity
    /// `total`, one entry per resource type.
    pub fn check_capacity(&self, total: &[Units]) -> Result<(), BankerError> {
        if total.len() != self.resources {
            return Err(BankerError::DimensionMismatch {
                field:      Field::Available,
                expected:   self.resources,
                found:      total.len(),
            });
        }
        for (j, (&expected, found)) in total.iter()
            .zip(self.total_capacity()?)
            .enumerate() {
            if expected != found {
                return Err(BankerError::CapacityMismatch {
                    resource: j,
                    expected,
                    found,
                });
            }
        }

        Ok(())
    }

    /// Process `i` has finished: everything it holds goes back to
    /// Available. Its maximum claim stays, so its need becomes
    /// the whole claim again.
    ///
    /// If some pool would overflow, nothing is released and
    /// [`BankerError::CapacityOverflow`] is returned.
    pub fn release(&mut self, i: usize) -> Result<(), BankerError> {
        self.check_process(i)?;
        let freed = self.available.iter()
            .zip(&self.allocation[i])
            .enumerate()
            .map(|(j, (&avail, &held))| {
                avail.checked_add(held)
                    .ok_or(BankerError::CapacityOverflow { resource: j })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.available = freed;
        self.allocation[i].iter_mut().for_each(|held| *held = 0);
        self.refresh_need(i);
        debug!(process = i, "released all holdings");

        Ok(())
    }

    /// Validates a request of process `i` against everything but
    /// availability.
    pub(crate) fn check_request(&self, i: usize, request: &[Units]) -> Result<(), BankerError> {
        self.check_process(i)?;
        if request.len() != self.resources {
            return Err(BankerError::OutOfRange {
                axis:   Axis::RequestLength,
                index:  request.len(),
                len:    self.resources,
            });
        }
        for (j, &v) in request.iter().enumerate() {
            check_value(Field::Request, Some(i), j, v)?;
        }
        for (j, (&requested, &need)) in request.iter()
            .zip(&self.need[i])
            .enumerate() {
            if requested > need {
                return Err(BankerError::ExceedsNeed {
                    process: i,
                    resource: j,
                    requested,
                    need,
                });
            }
        }

        Ok(())
    }

    /// Moves `request` from Available to process `i`. The request must
    /// already have passed [`check_request`](Self::check_request) and
    /// fit into Available.
    pub(crate) fn grant(&mut self, i: usize, request: &[Units]) -> Checkpoint {
        let checkpoint = Checkpoint {
            process:        i,
            allocation_row: self.allocation[i].clone(),
            available:      self.available.clone(),
        };
        for ((avail, held), &r) in self.available.iter_mut()
            .zip(self.allocation[i].iter_mut())
            .zip(request) {
            *avail -= r;
            *held += r;
        }
        self.refresh_need(i);
        debug_assert!(self.available.iter().all(|&a| a >= 0), "Granted beyond availability");

        checkpoint
    }

    /// Undoes a [`grant`](Self::grant).
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        let i = checkpoint.process;
        self.allocation[i] = checkpoint.allocation_row;
        self.available = checkpoint.available;
        self.refresh_need(i);
    }

    #[inline(always)]
    fn refresh_need(&mut self, i: usize) {
        for ((n, &m), &a) in self.need[i].iter_mut()
            .zip(&self.maximum[i])
            .zip(&self.allocation[i]) {
            *n = m - a;
        }
    }

    fn check_cell(&self, i: usize, j: usize) -> Result<(), BankerError> {
        self.check_process(i)?;
        self.check_resource(j)
    }

    fn check_process(&self, i: usize) -> Result<(), BankerError> {
        if i >= self.processes {
            return Err(BankerError::OutOfRange {
                axis:   Axis::Process,
                index:  i,
                len:    self.processes,
            });
        }

        Ok(())
    }

    fn check_resource(&self, j: usize) -> Result<(), BankerError> {
        if j >= self.resources {
            return Err(BankerError::OutOfRange {
                axis:   Axis::Resource,
                index:  j,
                len:    self.resources,
            });
        }

        Ok(())
    }
}

#[inline(always)]
fn check_value(field: Field, process: Option<usize>, resource: usize, value: Units) -> Result<(), BankerError> {
    if value < 0 {
        return Err(BankerError::NegativeValue {
            field,
            process,
            resource,
            value,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn new_state_is_all_zero() {
        let s = ResourceState::new(2, 3);
        assert_eq!(s.need(), vec![vec![0; 3]; 2]);
        assert_eq!(s.available(), &[0, 0, 0]);
    }

    #[test]
    fn empty_dimensions_are_fine() {
        let mut s = ResourceState::new(0, 0);
        assert_eq!(s.processes(), 0);
        s.resize(3, 0);
        assert_eq!(s.need(), vec![Vec::<Units>::new(); 3]);
        assert_eq!(s.total_capacity(), Ok(Vec::<Units>::new()));
    }

    #[test]
    fn resize_zeroes_everything() {
        let mut s = ResourceState::new(1, 1);
        s.set_maximum(0, 0, 4).unwrap();
        s.set_allocation(0, 0, 2).unwrap();
        s.set_available(0, 1).unwrap();
        s.resize(2, 2);
        assert_eq!(s, ResourceState::new(2, 2));
    }

    #[test]
    fn setters_reject_bad_cells() {
        let mut s = ResourceState::new(2, 2);
        let before = s.clone();
        assert_eq!(
            s.set_maximum(2, 0, 1),
            Err(BankerError::OutOfRange { axis: Axis::Process, index: 2, len: 2 })
        );
        assert_eq!(
            s.set_allocation(0, 5, 1),
            Err(BankerError::OutOfRange { axis: Axis::Resource, index: 5, len: 2 })
        );
        assert_eq!(
            s.set_available(1, -3),
            Err(BankerError::NegativeValue {
                field:      Field::Available,
                process:    None,
                resource:   1,
                value:      -3,
            })
        );
        assert!(matches!(
            s.set_maximum(1, 1, -1),
            Err(BankerError::NegativeValue { field: Field::Maximum, .. })
        ));
        assert_eq!(s, before);
    }

    #[test]
    fn allocation_never_exceeds_maximum() {
        let mut s = ResourceState::new(1, 1);
        assert_eq!(
            s.set_allocation(0, 0, 1),
            Err(BankerError::InvariantViolation {
                process:    0,
                resource:   0,
                allocation: 1,
                maximum:    0,
            })
        );
        s.set_maximum(0, 0, 3).unwrap();
        s.set_allocation(0, 0, 3).unwrap();
        assert!(matches!(
            s.set_maximum(0, 0, 2),
            Err(BankerError::InvariantViolation { .. })
        ));
        assert_eq!(s.maximum()[0][0], 3);
    }

    #[test]
    fn need_tracks_random_edits() {
        let mut rng = StdRng::seed_from_u64(0xBA4C);
        let mut s = ResourceState::new(4, 3);
        for _ in 0..500 {
            let (i, j) = (rng.gen_range(0..4), rng.gen_range(0..3));
            let v = rng.gen_range(-2..10);
            // Some of these fail; Need must stay consistent either way.
            if rng.gen_bool(0.5) {
                let _ = s.set_maximum(i, j, v);
            } else {
                let _ = s.set_allocation(i, j, v);
            }
            let snap = s.snapshot();
            for i in 0..4 {
                for j in 0..3 {
                    assert_eq!(snap.need[i][j], snap.maximum[i][j] - snap.allocation[i][j]);
                    assert!(snap.need[i][j] >= 0);
                }
            }
        }
    }

    #[test]
    fn snapshot_is_detached() {
        let mut s = ResourceState::new(1, 1);
        s.set_maximum(0, 0, 5).unwrap();
        let mut snap = s.snapshot();
        snap.need[0][0] = 99;
        let mut need = s.need();
        need[0][0] = 42;
        assert_eq!(s.need_row(0), &[5]);
    }

    #[test]
    fn from_matrices_validates_shape() {
        let err = ResourceState::from_matrices(
            vec![vec![1, 1], vec![1]],
            vec![vec![0, 0], vec![0]],
            vec![0, 0],
        );
        assert_eq!(
            err,
            Err(BankerError::DimensionMismatch { field: Field::Maximum, expected: 2, found: 1 })
        );
        let err = ResourceState::from_matrices(vec![vec![1]], vec![], vec![0]);
        assert!(matches!(err, Err(BankerError::DimensionMismatch { field: Field::Allocation, .. })));
    }

    #[test]
    fn capacity_and_release() {
        let mut s = ResourceState::from_matrices(
            vec![vec![3, 2], vec![1, 1]],
            vec![vec![1, 2], vec![1, 0]],
            vec![2, 1],
        ).unwrap();
        assert_eq!(s.total_capacity(), Ok(vec![4, 3]));
        assert_eq!(s.check_capacity(&[4, 3]), Ok(()));
        assert_eq!(
            s.check_capacity(&[4, 4]),
            Err(BankerError::CapacityMismatch { resource: 1, expected: 4, found: 3 })
        );
        assert!(s.check_capacity(&[4]).is_err());

        s.release(0).unwrap();
        assert_eq!(s.available(), &[3, 3]);
        assert_eq!(s.allocation()[0], vec![0, 0]);
        assert_eq!(s.need_row(0), &[3, 2]);
        assert_eq!(s.total_capacity(), Ok(vec![4, 3]));
        assert!(s.release(7).is_err());
    }

    #[test]
    fn huge_pools_do_not_overflow() {
        let mut s = ResourceState::from_matrices(
            vec![vec![1], vec![5]],
            vec![vec![1], vec![0]],
            vec![Units::MAX],
        ).unwrap();
        let before = s.clone();
        assert_eq!(s.total_capacity(), Err(BankerError::CapacityOverflow { resource: 0 }));
        assert_eq!(
            s.check_capacity(&[Units::MAX]),
            Err(BankerError::CapacityOverflow { resource: 0 })
        );
        assert_eq!(s.release(0), Err(BankerError::CapacityOverflow { resource: 0 }));
        assert_eq!(s, before);

        // One unit short of the edge is still countable.
        s.set_available(0, Units::MAX - 1).unwrap();
        assert_eq!(s.total_capacity(), Ok(vec![Units::MAX]));
        s.release(0).unwrap();
        assert_eq!(s.available(), &[Units::MAX]);
        assert_eq!(s.need_row(0), &[1]);
    }

    #[test]
    fn grant_then_restore_is_exact() {
        let mut s = ResourceState::from_matrices(
            vec![vec![3, 2]],
            vec![vec![1, 0]],
            vec![2, 2],
        ).unwrap();
        let before = s.clone();
        s.check_request(0, &[1, 2]).unwrap();
        let cp = s.grant(0, &[1, 2]);
        assert_eq!(s.available(), &[1, 0]);
        assert_eq!(s.need_row(0), &[1, 0]);
        s.restore(cp);
        assert_eq!(s, before);
    }
}
