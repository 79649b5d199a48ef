//! Location resolution: free-text location references to merged line intervals.

pub mod interval;
pub mod resolver;
pub mod spec;

pub use interval::{merge_intervals, LineInterval};
pub use resolver::{resolve, resolve_in_repository, ResolveOptions};
pub use spec::{parse_location_block, LocationSpec};
