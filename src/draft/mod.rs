// Draft domain: positions, eligibility, rosters, pick order, and the
// session state machine.

pub mod eligibility;
pub mod pick;
pub mod position;
pub mod roster;
pub mod schedule;
pub mod session;
