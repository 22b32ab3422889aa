use std::process::ExitCode;

fn main() -> ExitCode {
    match prismd::run_gateway() {
        Ok(report) if report.threads_exited_cleanly() => ExitCode::SUCCESS,
        Ok(report) => {
            eprintln!(
                "prismd: shutdown incomplete (queue: {:?}, monitor: {:?})",
                report.queue, report.monitor
            );
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("prismd: {error}");
            ExitCode::FAILURE
        }
    }
}
