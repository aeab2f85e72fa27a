use std::process::ExitCode;

fn main() -> ExitCode {
    shopsage_cli::run()
}
