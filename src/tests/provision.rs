//! Provisioning: standing claims that steer the allocator.

use serial_test::serial;

use super::helpers::{assert_consistent, boot, drain_all, spawn_mcp};
use crate::errno::Error;
use crate::ksched::{self, RequestOutcome};
use crate::process::{ReqFlags, ResourceRequest};

#[test]
#[serial]
fn provisioned_cores_are_preferred_over_lower_ids() {
    boot(8);
    let pid = ksched::create_process(0).unwrap();
    ksched::provision_core(pid, 6).unwrap();
    ksched::provision_core(pid, 7).unwrap();

    let outcome = ksched::request_cores(pid, ResourceRequest::new(3, 1)).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted(3));
    let snap = ksched::process_snapshot(pid).unwrap();
    // Both provisioned cores first, then the lowest unprovisioned one.
    assert!(snap.owned.contains(6));
    assert!(snap.owned.contains(7));
    assert!(snap.owned.contains(0));
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn cores_provisioned_to_others_are_borrowed_last() {
    boot(2);
    let other = ksched::create_process(0).unwrap();
    ksched::provision_core(other, 0).unwrap();
    ksched::provision_core(other, 1).unwrap();

    // Nothing else is idle, so the requester borrows a provisioned core;
    // provisioning is a preference, not a reservation.
    let (pid, outcome) = spawn_mcp(1, 1);
    assert_eq!(outcome, RequestOutcome::Granted(1));
    assert_eq!(ksched::core_owner(0), Some(pid));
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn unprovisioned_idle_beats_borrowing() {
    boot(3);
    let other = ksched::create_process(0).unwrap();
    ksched::provision_core(other, 0).unwrap();
    ksched::provision_core(other, 1).unwrap();

    let (pid, _) = spawn_mcp(1, 1);
    // Core 2 is unprovisioned; the lower-numbered provisioned ones are
    // left for their claimant.
    assert_eq!(ksched::core_owner(2), Some(pid));
    assert_eq!(ksched::core_owner(0), None);
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn provisioning_does_not_disturb_a_current_allocation() {
    boot(2);
    let (p1, _) = spawn_mcp(1, 1);
    let p2 = ksched::create_process(0).unwrap();
    // Claim the core p1 is running on; p1 keeps running.
    ksched::provision_core(p2, 0).unwrap();
    assert_eq!(ksched::core_owner(0), Some(p1));
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn reprovisioning_replaces_the_old_claim() {
    boot(4);
    let p1 = ksched::create_process(0).unwrap();
    let p2 = ksched::create_process(0).unwrap();
    ksched::provision_core(p1, 3).unwrap();
    ksched::provision_core(p2, 3).unwrap();

    assert!(!ksched::process_snapshot(p1).unwrap().provisioned.contains(3));
    assert!(ksched::process_snapshot(p2).unwrap().provisioned.contains(3));

    let outcome = ksched::request_cores(p2, ResourceRequest::new(1, 1)).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted(1));
    assert_eq!(ksched::core_owner(3), Some(p2));
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn deprovision_clears_the_claim() {
    boot(4);
    let pid = ksched::create_process(0).unwrap();
    ksched::provision_core(pid, 3).unwrap();
    ksched::deprovision_core(3).unwrap();
    assert!(!ksched::process_snapshot(pid).unwrap().provisioned.contains(3));

    // With no claim left, allocation falls back to lowest-id order.
    let outcome = ksched::request_cores(pid, ResourceRequest::new(1, 1)).unwrap();
    assert_eq!(outcome, RequestOutcome::Granted(1));
    assert_eq!(ksched::core_owner(0), Some(pid));
    drain_all();
    assert_consistent();
}

#[test]
#[serial]
fn provision_argument_checks() {
    boot(2);
    let pid = ksched::create_process(0).unwrap();
    assert_eq!(ksched::provision_core(pid, 9), Err(Error::Inval));
    assert_eq!(ksched::provision_core(999, 0), Err(Error::BadProc));
    assert_eq!(ksched::deprovision_core(9), Err(Error::Inval));
}

/// The open policy point around borrowing, made explicit: a claimant whose
/// provisioned core is on loan does not preempt the borrower. It waits
/// FCFS, and when cores free up it regains its provisioned one first.
#[test]
#[serial]
fn owner_requesting_a_loaned_core_waits_then_regains_it() {
    boot(2);
    let owner = ksched::create_process(0).unwrap();
    ksched::provision_core(owner, 1).unwrap();

    // A borrower takes both cores, including the provisioned one.
    let (borrower, o) = spawn_mcp(2, 2);
    assert_eq!(o, RequestOutcome::Granted(2));
    drain_all();

    // The claimant asks for one core: no preemption, just Pending.
    let req = ResourceRequest::new(1, 1).with_flags(ReqFlags::ASYNC);
    let outcome = ksched::request_cores(owner, req).unwrap();
    assert_eq!(outcome, RequestOutcome::Pending);
    assert_eq!(ksched::core_owner(1), Some(borrower));
    assert_eq!(ksched::get_stats().preempt_warnings, 0);

    // When both cores free up at once, the claimant gets core 1, its
    // provisioned one, not the lower-numbered core 0.
    ksched::destroy_process(borrower).unwrap();
    drain_all();
    assert_eq!(ksched::core_owner(1), Some(owner));
    assert_eq!(ksched::core_owner(0), None);
    assert_consistent();
}
