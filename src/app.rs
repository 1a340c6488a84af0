//! Shell session: one-shot execution or the interactive read-eval loop.
//!
//! The `App` owns the configuration, the execution engine and the trace
//! sink guard. Lines are parsed into descriptors and handed to the engine;
//! the loop stops on `quit`, end of input, or a strategy code outside 1..=8.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use nix::unistd::getpid;
use tracing::{debug, info, warn};

use crate::config::ShellConfig;
use crate::error::{LineError, ShellError};
use crate::shell::{parse_line, Engine, LineReader, Outcome, ParsedLine, Strategy};
use crate::utils::logger::{self, LogGuard};

pub struct App {
    config: ShellConfig,
    engine: Engine,
    last_outcome: Option<Outcome>,

    // Dropped last: keeps the trace sink installed for the whole session.
    log_guard: Option<LogGuard>,
}

impl App {
    /// Builds the session and installs the trace sink.
    ///
    /// A trace file that cannot be opened is reported on stderr and the
    /// shell runs without tracing.
    pub fn new(config: ShellConfig) -> Self {
        let log_guard = match logger::init_logging(&config.log) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: tracing disabled: {:#}", e);
                None
            }
        };
        info!("Main process PID={}", getpid());

        Self {
            config,
            engine: Engine::new(),
            last_outcome: None,
            log_guard,
        }
    }

    /// Runs the configured line, or the interactive loop on stdin/stdout.
    ///
    /// Returns the process exit status for the shell itself.
    pub fn run(&mut self) -> Result<i32> {
        match self.config.line.clone() {
            Some(line) => {
                info!("{}", line);
                self.handle_line(&line);
                Ok(self.exit_status())
            }
            None => {
                let stdin = io::stdin();
                let stdout = io::stdout();
                self.run_interactive(stdin.lock(), stdout.lock())?;
                Ok(0)
            }
        }
    }

    /// Prompts on `out` and handles lines from `input` until the session ends.
    pub fn run_interactive<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        let mut reader = LineReader::new(input, self.config.max_line_len);

        loop {
            info!("Waiting for user input...");
            write!(out, "{}", self.config.prompt).context("Failed to write prompt")?;
            out.flush().context("Failed to flush prompt")?;

            let line = match reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("End of input");
                    writeln!(out).context("Failed to write newline")?;
                    break;
                }
                Err(LineError::Io(e)) => {
                    return Err(e).context("Failed to read from standard input");
                }
                Err(e) => {
                    let e = ShellError::from(e);
                    warn!("{}", e);
                    eprintln!("myshell: {}", e);
                    continue;
                }
            };
            info!("{}", line);

            match self.handle_line(&line) {
                Some(strategy) if !strategy.keeps_session() => {
                    info!("Session ended by strategy code {}", strategy.code());
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Parses and executes one line.
    ///
    /// Returns the line's strategy, or `None` when nothing was run (blank or
    /// malformed line).
    pub fn handle_line(&mut self, line: &str) -> Option<Strategy> {
        match parse_line(line) {
            Ok(ParsedLine::Quit) => {
                info!("Quit requested");
                Some(Strategy::Quit)
            }
            Ok(ParsedLine::Empty) => {
                debug!("Empty line");
                None
            }
            Ok(ParsedLine::Command(descriptor)) => {
                let strategy = descriptor.strategy();
                let outcome = self.engine.execute(&descriptor);
                debug!("Line finished: {}", outcome);
                self.last_outcome = Some(outcome);
                Some(strategy)
            }
            Err(e) => {
                let e = ShellError::from(e);
                warn!("{}", e);
                eprintln!("myshell: {}", e);
                None
            }
        }
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Status of the last command, 0 if none ran, 1 if it never started.
    pub fn exit_status(&self) -> i32 {
        match self.last_outcome {
            None => 0,
            Some(outcome) => outcome.code().unwrap_or(1),
        }
    }

    pub fn trace_file(&self) -> Option<&std::path::Path> {
        self.log_guard.as_ref().map(|g| g.path())
    }
}
