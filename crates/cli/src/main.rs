use std::process::ExitCode;

fn main() -> ExitCode {
    partflow_cli::run()
}
