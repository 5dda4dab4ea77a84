//! Log line layout shared by the binaries

use std::io::Write;

use env_logger::{Builder, Env, Target};

/// Environment variable that may override log filters
pub const LOG_ENV: &str = "MZEXTRACTOR_LOG";

/// How a binary wants its log records written
pub struct LogSettings {
    /// Tool name printed on every line, upper-cased
    pub tool: String,
    /// DEBUG instead of INFO
    pub verbose: bool,
    pub target: Target,
}

impl LogSettings {
    pub fn new(tool: &str, verbose: bool, target: Target) -> Self {
        Self {
            tool: tool.to_uppercase(),
            verbose,
            target,
        }
    }

    fn level(&self) -> log::LevelFilter {
        match self.verbose {
            true => log::LevelFilter::Debug,
            false => log::LevelFilter::Info,
        }
    }

    /// Install the logger; records look like
    /// `MZ_EXTRACTOR - 4242 - 2024-01-01T12:00:00Z - INFO - message`
    pub fn init(self) {
        let tool = self.tool.clone();
        let pid = std::process::id();
        Builder::new()
            .filter_level(self.level())
            .parse_env(Env::default().filter(LOG_ENV))
            .target(self.target)
            .format(move |buf, record| {
                writeln!(
                    buf,
                    "{} - {} - {} - {} - {}",
                    tool,
                    pid,
                    buf.timestamp_seconds(),
                    record.level(),
                    record.args()
                )
            })
            .init();
    }
}
