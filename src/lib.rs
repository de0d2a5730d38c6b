// LOSAP Points Engine - Core Library
// Reconciles three heterogeneous activity exports into one per-member
// service-credit ledger. Exposes all modules for use in the CLI, UI
// front-ends, and tests.

pub mod config;
pub mod export;
pub mod ledger;
pub mod names;
pub mod parser;
pub mod scoring;
pub mod self_report;

// Re-export commonly used types
pub use config::{CellRef, ConfigError, EngineConfig};
pub use export::{default_output_path, write_xlsx};
pub use ledger::{
    Category, Ledger, MemberKey, MemberRecord, MemberUpdate, LEDGER_COLUMNS,
};
pub use names::{known_roster_fixes, NameCorrection, NameNormalizer};
pub use parser::{
    get_importer, AttendanceImporter, ImportError, ImportReport, ResponseLogImporter,
    SourceImport, SourceImporter, SourceType,
};
pub use scoring::CapPolicy;
pub use self_report::{
    CancelToken, ProgressUpdate, SelfReportBatch, SelfReportImporter, SelfReportReport,
    SkippedFile,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
