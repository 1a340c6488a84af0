//! Parsed, ready-to-run representation of one shell line.
//!
//! A `CommandDescriptor` has one variant per execution shape, so a piped
//! strategy always carries two argument vectors and an output mode always
//! comes with a path. The numeric `Strategy` is derived from the variant.

use std::ffi::{CString, NulError};
use std::fmt;
use std::path::{Path, PathBuf};

/// Program name followed by its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgVector {
    args: Vec<String>,
}

impl ArgVector {
    /// Builds an argument vector; `None` when `args` is empty.
    pub fn new(args: Vec<String>) -> Option<Self> {
        if args.is_empty() {
            None
        } else {
            Some(Self { args })
        }
    }

    /// The program to look up on `PATH`.
    pub fn program(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Converts to the C strings handed to `execvp`.
    pub fn to_cstrings(&self) -> Result<Vec<CString>, NulError> {
        self.args.iter().map(|a| CString::new(a.as_bytes())).collect()
    }
}

impl fmt::Display for ArgVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// `>`: truncate the file first.
    Overwrite,
    /// `>>`: keep existing content.
    Append,
}

impl OutputMode {
    pub fn operator(self) -> &'static str {
        match self {
            OutputMode::Overwrite => ">",
            OutputMode::Append => ">>",
        }
    }
}

/// Where standard output goes and how the file is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub mode: OutputMode,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }
}

/// One of the eight execution strategies, plus the session-ending code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Quit = 0,
    Single = 1,
    SingleIn = 2,
    SingleOutAppend = 3,
    SingleOutOverwrite = 4,
    Pipe = 5,
    PipeIn = 6,
    PipeOutAppend = 7,
    PipeOutOverwrite = 8,
}

impl Strategy {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// The interactive loop keeps going only for codes strictly between 0 and 9.
    pub fn keeps_session(self) -> bool {
        let code = self.code();
        code > 0 && code < 9
    }

    pub fn is_piped(self) -> bool {
        matches!(
            self,
            Strategy::Pipe | Strategy::PipeIn | Strategy::PipeOutAppend | Strategy::PipeOutOverwrite
        )
    }

    /// Short human description used in trace lines.
    pub fn describe(self) -> &'static str {
        match self {
            Strategy::Quit => "quit",
            Strategy::Single => "single command",
            Strategy::SingleIn => "single command with <",
            Strategy::SingleOutAppend => "single command with >> and possibly <",
            Strategy::SingleOutOverwrite => "single command with > and possibly <",
            Strategy::Pipe => "two piped commands",
            Strategy::PipeIn => "two piped commands with <",
            Strategy::PipeOutAppend => "two piped commands with >> and possibly <",
            Strategy::PipeOutOverwrite => "two piped commands with > and possibly <",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.code())
    }
}

/// A fully classified shell line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandDescriptor {
    Single {
        argv: ArgVector,
    },
    SingleIn {
        argv: ArgVector,
        input: PathBuf,
    },
    SingleOut {
        argv: ArgVector,
        input: Option<PathBuf>,
        output: OutputTarget,
    },
    Pipe {
        left: ArgVector,
        right: ArgVector,
    },
    PipeIn {
        left: ArgVector,
        right: ArgVector,
        input: PathBuf,
    },
    PipeOut {
        left: ArgVector,
        right: ArgVector,
        input: Option<PathBuf>,
        output: OutputTarget,
    },
}

impl CommandDescriptor {
    /// Picks the variant matching the given pieces.
    pub fn build(
        first: ArgVector,
        second: Option<ArgVector>,
        input: Option<PathBuf>,
        output: Option<OutputTarget>,
    ) -> Self {
        match (second, input, output) {
            (None, None, None) => CommandDescriptor::Single { argv: first },
            (None, Some(input), None) => CommandDescriptor::SingleIn { argv: first, input },
            (None, input, Some(output)) => CommandDescriptor::SingleOut {
                argv: first,
                input,
                output,
            },
            (Some(right), None, None) => CommandDescriptor::Pipe { left: first, right },
            (Some(right), Some(input), None) => CommandDescriptor::PipeIn {
                left: first,
                right,
                input,
            },
            (Some(right), input, Some(output)) => CommandDescriptor::PipeOut {
                left: first,
                right,
                input,
                output,
            },
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            CommandDescriptor::Single { .. } => Strategy::Single,
            CommandDescriptor::SingleIn { .. } => Strategy::SingleIn,
            CommandDescriptor::SingleOut { output, .. } => match output.mode {
                OutputMode::Append => Strategy::SingleOutAppend,
                OutputMode::Overwrite => Strategy::SingleOutOverwrite,
            },
            CommandDescriptor::Pipe { .. } => Strategy::Pipe,
            CommandDescriptor::PipeIn { .. } => Strategy::PipeIn,
            CommandDescriptor::PipeOut { output, .. } => match output.mode {
                OutputMode::Append => Strategy::PipeOutAppend,
                OutputMode::Overwrite => Strategy::PipeOutOverwrite,
            },
        }
    }

    /// The command that runs first (left of `|`, or the only one).
    pub fn primary(&self) -> &ArgVector {
        match self {
            CommandDescriptor::Single { argv }
            | CommandDescriptor::SingleIn { argv, .. }
            | CommandDescriptor::SingleOut { argv, .. } => argv,
            CommandDescriptor::Pipe { left, .. }
            | CommandDescriptor::PipeIn { left, .. }
            | CommandDescriptor::PipeOut { left, .. } => left,
        }
    }

    /// The command right of `|`, present only for piped variants.
    pub fn secondary(&self) -> Option<&ArgVector> {
        match self {
            CommandDescriptor::Pipe { right, .. }
            | CommandDescriptor::PipeIn { right, .. }
            | CommandDescriptor::PipeOut { right, .. } => Some(right),
            _ => None,
        }
    }

    pub fn input(&self) -> Option<&Path> {
        match self {
            CommandDescriptor::SingleIn { input, .. } | CommandDescriptor::PipeIn { input, .. } => {
                Some(input)
            }
            CommandDescriptor::SingleOut { input, .. } | CommandDescriptor::PipeOut { input, .. } => {
                input.as_deref()
            }
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&OutputTarget> {
        match self {
            CommandDescriptor::SingleOut { output, .. } | CommandDescriptor::PipeOut { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> ArgVector {
        ArgVector::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_empty_arg_vector_rejected() {
        assert!(ArgVector::new(Vec::new()).is_none());
    }

    #[test]
    fn test_arg_vector_program_and_display() {
        let a = argv(&["wc", "-l"]);
        assert_eq!(a.program(), "wc");
        assert_eq!(a.to_string(), "wc -l");
        assert_eq!(a.to_cstrings().unwrap().len(), 2);
    }

    #[test]
    fn test_interior_nul_is_rejected_for_exec() {
        let a = argv(&["echo", "a\0b"]);
        assert!(a.to_cstrings().is_err());
    }

    #[test]
    fn test_build_covers_all_strategies() {
        let cases = vec![
            (None, None, None, Strategy::Single),
            (None, Some("in.txt"), None, Strategy::SingleIn),
            (None, None, Some(OutputMode::Append), Strategy::SingleOutAppend),
            (None, Some("in.txt"), Some(OutputMode::Overwrite), Strategy::SingleOutOverwrite),
            (Some(argv(&["wc"])), None, None, Strategy::Pipe),
            (Some(argv(&["wc"])), Some("in.txt"), None, Strategy::PipeIn),
            (Some(argv(&["wc"])), None, Some(OutputMode::Append), Strategy::PipeOutAppend),
            (Some(argv(&["wc"])), Some("in.txt"), Some(OutputMode::Overwrite), Strategy::PipeOutOverwrite),
        ];

        for (second, input, mode, expected) in cases {
            let output = mode.map(|m| OutputTarget::new("out.txt", m));
            let desc = CommandDescriptor::build(argv(&["ls"]), second, input.map(PathBuf::from), output);
            assert_eq!(desc.strategy(), expected, "Failed for {:?}", desc);
            assert_eq!(desc.secondary().is_some(), expected.is_piped());
        }
    }

    #[test]
    fn test_accessors() {
        let desc = CommandDescriptor::build(
            argv(&["cat"]),
            Some(argv(&["sort"])),
            Some(PathBuf::from("a.txt")),
            Some(OutputTarget::new("b.txt", OutputMode::Overwrite)),
        );
        assert_eq!(desc.primary().program(), "cat");
        assert_eq!(desc.secondary().map(|a| a.program()), Some("sort"));
        assert_eq!(desc.input(), Some(Path::new("a.txt")));
        assert_eq!(desc.output().map(|o| o.path.as_path()), Some(Path::new("b.txt")));
    }

    #[test]
    fn test_session_codes() {
        assert!(!Strategy::Quit.keeps_session());
        assert!(Strategy::Single.keeps_session());
        assert!(Strategy::PipeOutOverwrite.keeps_session());
        assert_eq!(Strategy::PipeOutOverwrite.code(), 8);
        assert_eq!(Strategy::SingleOutAppend.code(), 3);
    }
}
