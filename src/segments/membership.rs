/// the membership segment: a reconciliation pass run as part of a full refresh
use std::sync::Arc;

use crate::error::{EngineError, SegmentError};
use crate::membership::MembershipReconciler;

pub async fn load_membership(reconciler: Arc<MembershipReconciler>) -> Result<usize, SegmentError> {
    match reconciler.reconcile().await {
        Ok(report) => Ok(report.writes + report.live_updates),
        Err(EngineError::AlreadyRunning(_)) => Err(SegmentError::NotReady(
            "a reconciliation pass is already in flight".to_string(),
        )),
        Err(EngineError::NotReady(reason)) => Err(SegmentError::NotReady(reason)),
        Err(err) => Err(SegmentError::Failed(err.into())),
    }
}
