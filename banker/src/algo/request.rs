use crate::helpe::*;

/// Decides whether process `i` may receive `request` right now.
///
/// The request is checked in this order:
///
/// 1. well-formedness: `i` is a process, `request` has one
///     non-negative entry per resource type;
/// 2. `request <= Need[i]`, else the process is asking for more than
///     it declared ([`BankerError::ExceedsNeed`]);
/// 3. `request <= Available`, else it must wait
///     ([`Refusal::ExceedsAvailable`]);
/// 4. the state after granting is safe, else [`Refusal::WouldDeadlock`].
///
/// Only in the last case is anything written: the units are moved
/// tentatively, [`check_safety`] runs, and the move is either kept
/// ([`RequestOutcome::Granted`]) or undone exactly.
pub fn request_allocation(
    state:      &mut ResourceState,
    i:          usize,
    request:    &[Units],
) -> RequestOutcome {
    if let Err(e) = state.check_request(i, request) {
        warn!(process = i, error = %e, "request rejected");
        return RequestOutcome::Rejected(e);
    }

    if let Some((j, (&requested, &available))) = request.iter()
        .zip(state.available())
        .enumerate()
        .find(|(_, (r, a))| r > a) {
        info!(process = i, resource = j, requested, available, "request must wait");
        return RequestOutcome::Denied(Refusal::ExceedsAvailable {
            resource: j,
            requested,
            available,
        });
    }

    let checkpoint = state.grant(i, request);
    let report = check_safety(state);
    if report.is_safe {
        info!(process = i, order = %report, "request granted");
        RequestOutcome::Granted { order: report.order }
    } else {
        state.restore(checkpoint);
        info!(process = i, stalled = ?report.stalled(), "request denied, state would be unsafe");
        RequestOutcome::Denied(Refusal::WouldDeadlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textbook() -> ResourceState {
        ResourceState::from_matrices(
            vec![vec![7, 5, 3], vec![3, 2, 2], vec![9, 0, 2], vec![2, 2, 2], vec![4, 3, 3]],
            vec![vec![0, 1, 0], vec![2, 0, 0], vec![3, 0, 2], vec![2, 1, 1], vec![0, 0, 2]],
            vec![3, 3, 2],
        ).unwrap()
    }

    #[test]
    fn safe_request_is_committed() {
        let mut s = textbook();
        let outcome = request_allocation(&mut s, 1, &[1, 0, 2]);
        assert_eq!(outcome, RequestOutcome::Granted { order: vec![1, 3, 4, 0, 2] });
        assert_eq!(s.available(), &[2, 3, 0]);
        assert_eq!(s.allocation()[1], vec![3, 0, 2]);
        assert_eq!(s.need_row(1), &[0, 2, 0]);
    }

    #[test]
    fn unsafe_request_is_rolled_back() {
        let mut s = textbook();
        request_allocation(&mut s, 1, &[1, 0, 2]);
        let before = s.snapshot();
        // Fits both P0's need and what's available, but afterwards
        // nobody's need fits into [0,1,0].
        let outcome = request_allocation(&mut s, 0, &[2, 2, 0]);
        assert_eq!(outcome, RequestOutcome::Denied(Refusal::WouldDeadlock));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn waits_when_units_are_missing() {
        let mut s = textbook();
        let before = s.clone();
        let outcome = request_allocation(&mut s, 0, &[4, 0, 0]);
        assert_eq!(
            outcome,
            RequestOutcome::Denied(Refusal::ExceedsAvailable { resource: 0, requested: 4, available: 3 })
        );
        assert_eq!(s, before);
    }

    #[test]
    fn draining_the_pool_is_unsafe() {
        let mut s = textbook();
        let before = s.clone();
        // Leaves [0,0,1] free and P4 one unit of R0 short.
        let outcome = request_allocation(&mut s, 4, &[3, 3, 1]);
        assert_eq!(outcome, RequestOutcome::Denied(Refusal::WouldDeadlock));
        assert_eq!(s, before);
    }

    #[test]
    fn contract_violations_are_rejected() {
        let mut s = textbook();
        let before = s.clone();
        assert_eq!(
            request_allocation(&mut s, 5, &[0, 0, 0]),
            RequestOutcome::Rejected(BankerError::OutOfRange { axis: Axis::Process, index: 5, len: 5 })
        );
        assert_eq!(
            request_allocation(&mut s, 0, &[0, 0]),
            RequestOutcome::Rejected(BankerError::OutOfRange {
                axis:   Axis::RequestLength,
                index:  2,
                len:    3,
            })
        );
        assert!(matches!(
            request_allocation(&mut s, 0, &[0, 0, 0, 0]),
            RequestOutcome::Rejected(BankerError::OutOfRange { axis: Axis::RequestLength, index: 4, .. })
        ));
        assert!(matches!(
            request_allocation(&mut s, 0, &[0, -1, 0]),
            RequestOutcome::Rejected(BankerError::NegativeValue { field: Field::Request, .. })
        ));
        assert_eq!(
            request_allocation(&mut s, 3, &[0, 2, 0]),
            RequestOutcome::Rejected(BankerError::ExceedsNeed {
                process:    3,
                resource:   1,
                requested:  2,
                need:       1,
            })
        );
        assert_eq!(s, before);
    }

    #[test]
    fn wrong_length_reads_as_out_of_range() {
        let mut s = ResourceState::new(1, 2);
        let outcome = request_allocation(&mut s, 0, &[0]);
        assert_eq!(
            outcome.to_string(),
            "rejected: request length 1 is out of range (limit 2)"
        );
        assert_eq!(s, ResourceState::new(1, 2));
    }

    #[test]
    fn empty_request_is_granted_when_safe() {
        let mut s = textbook();
        assert!(request_allocation(&mut s, 2, &[0, 0, 0]).is_granted());
        assert_eq!(s, textbook());
    }
}
