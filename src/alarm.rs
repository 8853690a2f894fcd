//! One-shot alarms on the scheduler's virtual clock.
//!
//! Each armed alarm carries a revocation token (core id plus the grant
//! sequence the revocation was issued against). `cancel` returns whether the
//! alarm was still armed, which is what makes cooperative yield and deadline
//! expiry mutually exclusive: whichever path reaches the alarm table first
//! wins, and the loser sees a disarmed alarm (or a stale token).

use alloc::vec::Vec;

use lazy_static::lazy_static;
use spin::Mutex;

pub type AlarmId = u64;

/// Identifies the revocation an alarm belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevokeToken {
    pub core: usize,
    pub seq: u64,
}

struct Alarm {
    id: AlarmId,
    deadline: u64,
    token: RevokeToken,
}

struct AlarmTable {
    alarms: Vec<Alarm>,
    next_id: AlarmId,
}

lazy_static! {
    static ref ALARMS: Mutex<AlarmTable> = Mutex::new(AlarmTable {
        alarms: Vec::new(),
        next_id: 1,
    });
}

/// Arm a one-shot alarm for `deadline` (inclusive).
pub fn arm(deadline: u64, token: RevokeToken) -> AlarmId {
    let mut table = ALARMS.lock();
    let id = table.next_id;
    table.next_id += 1;
    table.alarms.push(Alarm {
        id,
        deadline,
        token,
    });
    id
}

/// Disarm an alarm. Returns true iff it was still armed, i.e. it has not
/// fired and will not fire.
pub fn cancel(id: AlarmId) -> bool {
    let mut table = ALARMS.lock();
    let before = table.alarms.len();
    table.alarms.retain(|a| a.id != id);
    table.alarms.len() != before
}

/// Remove and return the tokens of every alarm due at `now`, earliest
/// deadline first (ties by arming order).
pub fn due(now: u64) -> Vec<RevokeToken> {
    let mut table = ALARMS.lock();
    let mut fired: Vec<Alarm> = Vec::new();
    let mut keep: Vec<Alarm> = Vec::new();
    for alarm in table.alarms.drain(..) {
        if alarm.deadline <= now {
            fired.push(alarm);
        } else {
            keep.push(alarm);
        }
    }
    table.alarms = keep;
    fired.sort_by_key(|a| (a.deadline, a.id));
    fired.into_iter().map(|a| a.token).collect()
}

pub fn armed_count() -> usize {
    ALARMS.lock().alarms.len()
}

pub(crate) fn reset() {
    let mut table = ALARMS.lock();
    table.alarms.clear();
    table.next_id = 1;
}
