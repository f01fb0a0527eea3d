use std::process::ExitCode;

fn main() -> ExitCode {
    guardian_cli::run()
}
