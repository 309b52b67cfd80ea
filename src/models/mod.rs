pub mod notebook;
pub mod record;
pub mod student;

pub use notebook::{Cell, Notebook, Output};
pub use record::{
    FileDetail, GradingResult, NotebookRecord, SubmissionResult, SubmissionSummary,
};
pub use student::StudentInfo;
