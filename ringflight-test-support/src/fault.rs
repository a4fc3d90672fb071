//! Fault injection for recording runtimes.

use ringflight::StatusCode;

/// Which operation of a run should fail, counted from 1 across all handles
/// that share one [`EventLog`](crate::EventLog).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    fail_issue_at: Option<u64>,
    fail_wait_at: Option<u64>,
    status: Option<StatusCode>,
}

impl FaultPlan {
    /// No faults
    pub fn none() -> Self {
        Self::default()
    }

    /// The `n`-th `issue_async` call returns an error
    pub fn fail_issue_at(n: u64) -> Self {
        Self { fail_issue_at: Some(n), ..Self::default() }
    }

    /// The `n`-th `block_until_done` call reports `GENERAL_ERROR`
    pub fn fail_wait_at(n: u64) -> Self {
        Self { fail_wait_at: Some(n), ..Self::default() }
    }

    /// Status reported by the failing wait
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn issue_fails(&self, issue_number: u64) -> bool {
        self.fail_issue_at == Some(issue_number)
    }

    pub fn wait_status(&self, wait_number: u64) -> StatusCode {
        if self.fail_wait_at == Some(wait_number) {
            self.status.unwrap_or(StatusCode::GeneralError)
        } else {
            StatusCode::Ok
        }
    }
}
