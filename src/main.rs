//! Main entry point for myshell.
//!
//! Parses the command line, builds the session, and exits with the status
//! the session reports: the command's status in one-shot mode, 0 after an
//! interactive session.

use myshell::app::App;
use myshell::cli;
use myshell::config::ShellConfig;

fn main() {
    match run_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("myshell error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let config = ShellConfig::from_args(args)?;
    let mut app = App::new(config);
    app.run()
}
