pub mod draft;
pub mod employee;
pub mod holiday;
pub mod leave_request;
pub mod pending_approval;

pub use draft::{LeaveRequestDraft, PendingConfirmation, WfhRequestDraft};
pub use employee::{EmployeeIdentity, Gender};
pub use holiday::Holiday;
pub use leave_request::{LeaveType, RequestKind, RequestRecord, RequestStatus};
pub use pending_approval::PendingApprovalRecord;
