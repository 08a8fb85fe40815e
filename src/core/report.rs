use crate::core::connectivity::NetworkStatus;
use crate::models::sync_report::DrainReport;
use crate::ui::messages;

/// User-visible side of the sync engine.
pub trait SyncReporter: Send + Sync {
    fn drain_finished(&self, report: &DrainReport);

    fn connectivity_changed(&self, _status: NetworkStatus) {}
}

/// Prints toast-style lines on the terminal.
pub struct ConsoleReporter;

impl SyncReporter for ConsoleReporter {
    fn drain_finished(&self, report: &DrainReport) {
        messages::drain_outcome(report);
    }

    fn connectivity_changed(&self, status: NetworkStatus) {
        match status {
            NetworkStatus::Online => messages::info("Back online: syncing queued changes…"),
            NetworkStatus::Offline => messages::offline_notice(),
        }
    }
}
