use clap::Parser;
use std::process::ExitCode;
use writer_cli::{run, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    run(Args::parse()).await.into()
}
