pub mod checklist;
pub mod error;
pub mod io;
pub mod paths;
pub mod section;
pub mod snapshot;
pub mod spec_index;
pub mod state;
pub mod story;
pub mod transition;

pub use error::{HandoffError, Result};
