pub mod batch;
pub mod diff;
pub mod engine;
pub mod report;
pub mod retry;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;
