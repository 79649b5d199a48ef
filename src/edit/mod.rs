//! Edit commands: parsing them out of model text and applying them to a file.

pub mod apply;
pub mod errors;
pub mod operation;
pub mod parser;

pub use apply::{apply, ApplyOutcome};
pub use errors::{ApplyError, NearMiss};
pub use operation::{EditOperation, EditSyntax, FilePolicy};
pub use parser::{parse_edits, EditPlan};
