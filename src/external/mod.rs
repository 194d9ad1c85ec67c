pub mod runner;
pub mod tools;

pub use tools::{
    Absent, BruteResolver, Capability, ContentTypeDetector, HttpFingerprinter, PassiveEnumerator,
    StreamProber, Toolbox,
};
