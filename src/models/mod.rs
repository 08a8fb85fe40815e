pub mod action;
pub mod sync_report;

pub use action::{ActionKind, ActionRequest, PendingAction, QueryKey};
pub use sync_report::DrainReport;
