use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Aggregate,
    Merge,
    Rasterize,
    Climatology,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Aggregate => "aggregate",
            Stage::Merge => "merge",
            Stage::Rasterize => "rasterize",
            Stage::Climatology => "climatology",
        };
        write!(f, "{}", name)
    }
}

/// Non-fatal conditions met while processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A file name, header or field could not be interpreted
    ParseError,
    /// A malformed or numerically invalid row was left out
    RowSkipped,
    /// A stage or sub-step had nothing to process
    EmptyResult,
    /// Tables being merged disagree on their station rows
    RowMismatch,
    /// The same month column arrived twice; the later one was kept
    DuplicateColumn,
    /// The same station coordinate appears twice in one table
    DuplicateStation,
    /// A point fell outside the raster grid
    DroppedPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn with_file(mut self, file: &Path) -> Self {
        self.file = Some(file.to_path_buf());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}", self.stage, self.kind)?;
        if let Some(ref file) = self.file {
            write!(f, " {}", file.display())?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything a stage skipped or repaired, returned alongside its output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::RowSkipped | DiagnosticKind::DroppedPoint => debug!("{}", diagnostic),
            _ => warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn merge(&mut self, other: DiagnosticReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Generate a summary report
    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Diagnostics Report ===\n");
        summary.push_str(&format!("Total Diagnostics: {}\n", self.diagnostics.len()));

        let mut by_stage: BTreeMap<(Stage, DiagnosticKind), usize> = BTreeMap::new();
        for d in &self.diagnostics {
            *by_stage.entry((d.stage, d.kind)).or_default() += 1;
        }
        for ((stage, kind), count) in &by_stage {
            summary.push_str(&format!("  {:<12} {:?}: {}\n", stage.to_string(), kind, count));
        }

        let notable: Vec<&Diagnostic> = self
            .diagnostics
            .iter()
            .filter(|d| d.kind != DiagnosticKind::RowSkipped)
            .collect();
        if !notable.is_empty() {
            summary.push_str("\nFirst 10 File-Level Issues:\n");
            for (i, d) in notable.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. {}\n", i + 1, d));
            }
        }

        summary
    }
}
