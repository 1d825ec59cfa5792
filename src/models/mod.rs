pub mod branch;
pub mod identifier;
pub mod record;
pub mod request;
pub mod table;

pub use identifier::{expand, expand_with_warnings, Expansion, Identifier, RangeSegment, RangeWarning};
pub use record::{CapturedPage, CapturedPages, StudentRecord, SubjectMark, NAME_COLUMN, USN_COLUMN};
pub use request::ScrapeRequest;
pub use table::{ResultTable, SubjectColumns};
