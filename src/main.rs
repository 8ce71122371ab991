use std::process::ExitCode;

fn main() -> ExitCode {
    match journal_cli::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
