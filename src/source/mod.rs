mod data_source;
mod metadata;
mod refresh;
mod state;
mod traits;

pub use data_source::{DataSource, Generation, Schedule, SourceStatus};
pub use metadata::Metadata;
pub use refresh::RefreshOutcome;
pub use state::{Lookup, RefreshState};
pub use traits::{Dataset, Provider, Record, RefreshSource};
