//! Core requests and the FCFS allocation policy.

use serial_test::serial;

use super::helpers::{assert_consistent, boot, drain_all, spawn_mcp};
use crate::errno::Error;
use crate::ksched::{self, RequestOutcome};
use crate::process::{ProcState, ReqFlags, ResourceRequest};

#[test]
#[serial]
fn four_of_eight_cores_granted_in_id_order() {
    boot(8);
    let (pid, outcome) = spawn_mcp(4, 1);
    assert_eq!(outcome, RequestOutcome::Granted(4));

    let snap = ksched::process_snapshot(pid).unwrap();
    assert_eq!(snap.state, ProcState::RunningM);
    assert_eq!(snap.granted, 4);
    // FCFS with no provisioning picks the lowest-numbered idle cores.
    for core in 0..4 {
        assert_eq!(ksched::core_owner(core), Some(pid));
        assert!(snap.owned.contains(core));
    }
    for core in 4..8 {
        assert_eq!(ksched::core_owner(core), None);
    }
    assert_eq!(ksched::idle_core_count(), 4);

    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn unmet_minimum_leaves_registry_untouched() {
    boot(8);
    let (p1, _) = spawn_mcp(6, 1);
    drain_all();

    // Only 2 idle cores remain; a request with minimum 4 cannot start.
    let (p2, outcome) = spawn_mcp(4, 4);
    assert_eq!(outcome, RequestOutcome::Pending);

    let snap = ksched::process_snapshot(p2).unwrap();
    assert_eq!(snap.state, ProcState::RunnableM);
    assert_eq!(snap.granted, 0);
    assert!(snap.owned.is_empty());
    assert_eq!(ksched::idle_core_count(), 2);
    assert_eq!(ksched::process_snapshot(p1).unwrap().granted, 6);
    assert_consistent();
}

#[test]
#[serial]
fn head_of_line_blocks_later_requests() {
    boot(4);
    let (p1, _) = spawn_mcp(3, 3);
    // p2's minimum of 2 cannot be met with 1 idle core.
    let (p2, o2) = spawn_mcp(2, 2);
    assert_eq!(o2, RequestOutcome::Pending);
    // p3 only needs the 1 idle core, but FCFS never services around a
    // blocked head.
    let (p3, o3) = spawn_mcp(1, 1);
    assert_eq!(o3, RequestOutcome::Pending);
    assert_eq!(ksched::idle_core_count(), 1);

    // Freeing p1's cores unblocks the queue in arrival order.
    ksched::destroy_process(p1).unwrap();
    drain_all();

    assert_eq!(ksched::process_snapshot(p2).unwrap().granted, 2);
    assert_eq!(ksched::process_snapshot(p3).unwrap().granted, 1);
    assert_eq!(ksched::process_snapshot(p2).unwrap().state, ProcState::RunningM);
    assert_eq!(ksched::process_snapshot(p3).unwrap().state, ProcState::RunningM);
    assert_consistent();
}

#[test]
#[serial]
fn partial_grant_keeps_head_position() {
    boot(5);
    let (p1, _) = spawn_mcp(2, 1);
    // Wants 4, minimum 1: takes the 3 remaining cores and stays pending.
    let (p2, o2) = spawn_mcp(4, 1);
    assert_eq!(o2, RequestOutcome::Pending);
    assert_eq!(ksched::process_snapshot(p2).unwrap().granted, 3);
    assert_eq!(ksched::process_snapshot(p2).unwrap().state, ProcState::RunningM);

    // A freed core goes to the partially-granted head, not to a newcomer.
    let (p3, o3) = spawn_mcp(1, 1);
    assert_eq!(o3, RequestOutcome::Pending);
    ksched::destroy_process(p1).unwrap();
    drain_all();

    assert_eq!(ksched::process_snapshot(p2).unwrap().granted, 4);
    assert_eq!(ksched::process_snapshot(p3).unwrap().granted, 1);
    assert_consistent();
}

#[test]
#[serial]
fn grant_outcomes_count_in_stats() {
    boot(8);
    let (_, _) = spawn_mcp(3, 1);
    assert_eq!(ksched::get_stats().grants, 3);
}

#[test]
#[serial]
fn zero_wanted_is_invalid() {
    boot(2);
    let pid = ksched::create_process(0).unwrap();
    let err = ksched::request_cores(pid, ResourceRequest::new(0, 0));
    assert_eq!(err, Err(Error::Inval));
    // Still untouched and placeable afterwards.
    assert_eq!(ksched::process_snapshot(pid).unwrap().state, ProcState::Created);
}

#[test]
#[serial]
fn min_above_wanted_is_invalid() {
    boot(2);
    let pid = ksched::create_process(0).unwrap();
    let err = ksched::request_cores(pid, ResourceRequest::new(1, 2));
    assert_eq!(err, Err(Error::Inval));
}

#[test]
#[serial]
fn unknown_pid_is_rejected() {
    boot(2);
    assert_eq!(
        ksched::request_cores(999, ResourceRequest::new(1, 1)),
        Err(Error::BadProc)
    );
}

#[test]
#[serial]
fn shrinking_below_grant_clamps_and_fails() {
    boot(4);
    let (pid, _) = spawn_mcp(3, 1);
    // Asking for less than already granted is a yield, not a request.
    let err = ksched::request_cores(pid, ResourceRequest::new(1, 1));
    assert_eq!(err, Err(Error::Inval));
    let snap = ksched::process_snapshot(pid).unwrap();
    assert_eq!(snap.granted, 3);
    assert_eq!(snap.wanted, 3);
}

#[test]
#[serial]
fn growing_a_running_mcp_takes_more_cores() {
    boot(8);
    let (pid, _) = spawn_mcp(2, 1);
    let outcome = ksched::request_cores(pid, ResourceRequest::new(5, 1)).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted(5));
    assert_eq!(ksched::process_snapshot(pid).unwrap().granted, 5);
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn single_core_process_promotes_to_mcp() {
    boot(4);
    let pid = ksched::create_process(0).unwrap();
    assert_eq!(ksched::run_process(pid).unwrap(), RequestOutcome::Granted(1));
    let before = ksched::process_snapshot(pid).unwrap();
    assert_eq!(before.state, ProcState::RunningS);
    assert!(!before.is_mcp);

    let outcome = ksched::request_cores(pid, ResourceRequest::new(3, 1)).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted(3));
    let after = ksched::process_snapshot(pid).unwrap();
    assert_eq!(after.state, ProcState::RunningM);
    assert!(after.is_mcp);
    assert_eq!(after.granted, 3);
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn cancel_drops_the_unmet_remainder() {
    boot(2);
    let (p1, _) = spawn_mcp(2, 1);
    let (p2, o2) = spawn_mcp(2, 1);
    assert_eq!(o2, RequestOutcome::Pending);

    ksched::cancel_request(p2).unwrap();
    let snap = ksched::process_snapshot(p2).unwrap();
    assert_eq!(snap.wanted, snap.granted);
    assert_eq!(ksched::get_stats().requests_cancelled, 1);

    // Cores freed later no longer flow to the cancelled request.
    ksched::destroy_process(p1).unwrap();
    drain_all();
    assert_eq!(ksched::process_snapshot(p2).unwrap().granted, 0);
    assert_eq!(ksched::idle_core_count(), 2);
    assert_consistent();
}

#[test]
#[serial]
fn dying_process_cannot_request() {
    boot(2);
    let (pid, _) = spawn_mcp(1, 1);
    ksched::destroy_process(pid).unwrap();
    assert_eq!(
        ksched::request_cores(pid, ResourceRequest::new(1, 1)),
        Err(Error::Dying)
    );
    drain_all();
}

#[test]
#[serial]
fn request_flavors_differ_on_an_unmet_minimum() {
    boot(2);
    let (_, o) = spawn_mcp(2, 2);
    assert_eq!(o, RequestOutcome::Granted(2));

    // Plain flavor: nothing granted, minimum unmet, the caller is told so.
    let sync_pid = ksched::create_process(0).unwrap();
    assert_eq!(
        ksched::request_cores(sync_pid, ResourceRequest::new(1, 1)),
        Err(Error::NoFreeEnv)
    );

    // Async flavor of the identical request is accepted as pending.
    let async_pid = ksched::create_process(0).unwrap();
    let req = ResourceRequest::new(1, 1).with_flags(ReqFlags::ASYNC);
    assert_eq!(
        ksched::request_cores(async_pid, req),
        Ok(RequestOutcome::Pending)
    );
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn failed_plain_request_stays_queued() {
    boot(1);
    let (p1, o) = spawn_mcp(1, 1);
    assert_eq!(o, RequestOutcome::Granted(1));
    let p2 = ksched::create_process(0).unwrap();
    assert_eq!(
        ksched::request_cores(p2, ResourceRequest::new(1, 1)),
        Err(Error::NoFreeEnv)
    );
    // The error only reports the empty grant; the request is still on the
    // queue and is serviced as soon as a core frees up.
    assert_eq!(ksched::process_snapshot(p2).unwrap().state, ProcState::RunnableM);
    ksched::destroy_process(p1).unwrap();
    drain_all();
    let snap = ksched::process_snapshot(p2).unwrap();
    assert_eq!(snap.granted, 1);
    assert_eq!(snap.state, ProcState::RunningM);
    assert_consistent();
}

#[test]
#[serial]
fn plain_partial_grant_above_minimum_is_pending() {
    boot(3);
    let (_, o) = spawn_mcp(1, 1);
    assert_eq!(o, RequestOutcome::Granted(1));
    // Wants 4 but its minimum of 1 is met by the 2 idle cores, so the
    // plain flavor still reports a pending partial grant, not an error.
    let pid = ksched::create_process(0).unwrap();
    assert_eq!(
        ksched::request_cores(pid, ResourceRequest::new(4, 1)),
        Ok(RequestOutcome::Pending)
    );
    assert_eq!(ksched::process_snapshot(pid).unwrap().granted, 2);
    drain_all();
    assert_consistent();
}
