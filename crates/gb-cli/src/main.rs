//! `benchmark <m> <n> <k>` - print the best-of-N SGEMM time in nanoseconds.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let code = gb_cli::run_from_args(
        std::env::args_os(),
        |cli| {
            gb_cli::logging::init(cli.verbose)?;
            gb_cli::open_backend(cli)
        },
        &mut stdout.lock(),
        &mut stderr.lock(),
    );
    ExitCode::from(code)
}
