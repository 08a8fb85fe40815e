pub mod cache;
pub mod connectivity;
pub mod dispatcher;
pub mod engine;
pub mod orchestrator;
pub mod report;
pub mod retry;
