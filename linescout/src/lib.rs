pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use metrics::{SearchMetrics, SearchStats};
pub use results::{Match, SearchOutput, SearchQuery};
pub use search::{CompiledPattern, PatternCache, SearchEngine};
