use std::path::PathBuf;

use vvc::ConversionConfig;

use crate::cli::Command;

/// What the program does with its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Record,
    LengthPrefixed,
    Inspect,
}

/// Configuration for the entire program
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub task: Task,

    pub input: PathBuf,

    /// Not set for [`Task::Inspect`]
    pub output: Option<PathBuf>,

    pub conversion: ConversionConfig,
}

impl From<Command> for ProgramConfig {
    fn from(command: Command) -> Self {
        match command {
            Command::Record {
                input,
                output,
                incomplete_arrays,
                length_size,
            } => Self {
                task: Task::Record,
                input,
                output: Some(output),
                conversion: ConversionConfig::builder()
                    .length_size(length_size)
                    .ps_array_completeness(!incomplete_arrays)
                    .build(),
            },
            Command::LengthPrefixed {
                input,
                output,
                filter_ps,
                length_size,
            } => Self {
                task: Task::LengthPrefixed,
                input,
                output: Some(output),
                conversion: ConversionConfig::builder()
                    .length_size(length_size)
                    .filter_parameter_sets(filter_ps)
                    .build(),
            },
            Command::Inspect { input } => Self {
                task: Task::Inspect,
                input,
                output: None,
                conversion: ConversionConfig::default(),
            },
        }
    }
}
