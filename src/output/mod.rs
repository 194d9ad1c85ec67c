pub mod async_writer;
pub mod summary;
pub mod writer_csv;
pub mod writer_jsonl;

pub use summary::RunSummary;
pub use writer_csv::write_endpoints_csv;
pub use writer_jsonl::write_jsonl;
