pub mod formatter;
pub mod writer;

pub use formatter::format_summary;
pub use writer::write_report;
