use crate::error::{Failure, FailureKind};
use crate::node::NodeId;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// A branch that ended because its node could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct BranchFailure {
    pub xid: NodeId,
    pub status: u16,
    pub kind: FailureKind,
    pub message: String,
}

impl BranchFailure {
    pub fn new(xid: NodeId, failure: &Failure) -> Self {
        Self {
            xid,
            status: failure.status,
            kind: failure.kind,
            message: failure.message.clone(),
        }
    }
}

/// Summary of one exploration run.
#[derive(Debug, Clone, Serialize)]
pub struct ExploreStats {
    pub name: String,
    pub discovered: usize,
    pub requests: usize,
    pub skipped: usize,
    pub failures: Vec<BranchFailure>,
    pub aborted: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ExploreStats {
    pub fn new(name: String) -> Self {
        Self {
            name,
            discovered: 0,
            requests: 0,
            skipped: 0,
            failures: Vec::new(),
            aborted: false,
            elapsed: Duration::from_secs(0),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}
