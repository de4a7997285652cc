//! Result lines written to stdout

use std::io::{self, Write};

use clap::ValueEnum;

use crate::pipeline::runner::Decision;

/// How a decision line is formatted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `name old new`
    #[default]
    Plain,
    /// `name,old,new`
    Csv,
}

impl OutputFormat {
    fn separator(self) -> char {
        match self {
            OutputFormat::Plain => ' ',
            OutputFormat::Csv => ',',
        }
    }
}

/// Writes one line per decision, flushing after each so results appear as
/// soon as they are known
pub struct DecisionWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> DecisionWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn write(&mut self, decision: &Decision) -> io::Result<()> {
        let sep = self.format.separator();
        writeln!(
            self.out,
            "{}{sep}{}{sep}{}",
            decision.name, decision.old_version, decision.new_version
        )?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
