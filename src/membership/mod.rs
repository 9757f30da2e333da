/// membership reconciliation.
///
/// Three sources describe who holds which tier:
/// * the external authority: correct, but slow to become queryable after start
/// * the persisted secondary cache: available immediately, possibly stale
/// * the live user records: what consumers actually see
///
/// The reconciler diffs the authority (plus the override set) against the persisted
/// cache, writes the corrections back one row at a time, and brings the live records
/// in line.
///
pub mod diff;
pub mod overrides;
pub mod provider;
pub mod reconciler;

pub use diff::{collapse, desired_tiers, MembershipSnapshot, ReconciliationDiff, Source};
pub use overrides::OverrideSet;
pub use provider::{MembershipProvider, StaticProvider};
pub use reconciler::{MembershipReconciler, ReconcileReport};
