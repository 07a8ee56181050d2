// ABOUTME: Library half of the e2b-writer CLI
// ABOUTME: Argument model, logging setup, exit mapping and the run flow used by the binary

pub mod app;
pub mod args;
pub mod exit;
pub mod logging;

#[cfg(test)]
mod tests;

pub use app::{connect, execute, run, Invocation};
pub use args::Args;
pub use exit::RunExit;
