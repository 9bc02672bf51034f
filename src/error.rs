use thiserror::Error;

use crate::lcore::{LCore, LCoreState, NumaSocket};

#[derive(Error, Debug)]
pub enum LcoreError {
    #[error("Configuration Error: {0}")]
    ConfigMissing(String),
    #[error("Topology Error: {0}")]
    Topology(String),

    // نفاد الموارد: نتيجة طبيعية وليست عطلاً
    #[error("No Capacity: no lcore available for role '{role}' on socket {socket}")]
    NoCapacity { role: String, socket: NumaSocket },
    #[error("Not Found: no idle lcore owned by role '{role}' (socket {socket})")]
    NotFound { role: String, socket: NumaSocket },

    #[error("LCore Busy: lcore {lc} is {state:?}")]
    LCoreBusy { lc: LCore, state: LCoreState },
    #[error("Invalid LCore: {0}")]
    InvalidLCore(LCore),
    #[error("Launch Failed: {0}")]
    LaunchFailed(String),
    #[error("Controller Stopped")]
    ControllerStopped,

    /// خرق عقد الاستدعاء (مثل التحرير المزدوج). لا يُعاد أبداً كقيمة، بل يُستخدم كرسالة panic.
    #[error("Contract Violation: {0}")]
    ContractViolation(String),
}

pub type LcoreResult<T> = Result<T, LcoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LcoreError::NoCapacity { role: "rx".into(), socket: NumaSocket::new(1) };
        assert_eq!(err.to_string(), "No Capacity: no lcore available for role 'rx' on socket 1");

        let err = LcoreError::NotFound { role: "tx".into(), socket: NumaSocket::ANY };
        assert_eq!(err.to_string(), "Not Found: no idle lcore owned by role 'tx' (socket any)");

        let err = LcoreError::ContractViolation("lcore 3 double free".into());
        assert_eq!(err.to_string(), "Contract Violation: lcore 3 double free");
    }
}
