pub mod diagnostics_log;

pub use diagnostics_log::{
    DiagnosticEvent, DiagnosticSink, NoopSink, RingBufferLog, DEFAULT_DIAGNOSTICS_CAPACITY,
};
