pub mod amazon;
pub mod cell;
pub mod config;
pub mod filters;
pub mod header;
pub mod mapper;
pub mod pipeline;
pub mod schema;
pub mod truth;
pub mod workbook;

pub use amazon::{AmazonClassifier, AmazonDetail, AmazonParent, MatchOptions};
pub use cell::{Cell, CellError, DateOrder};
pub use config::{AppConfig, CategoriesConfig, ConfigError, SuppressConfig};
pub use header::{HeaderLocation, HeaderLocator, HeaderMap};
pub use pipeline::{Flags, PipelineError, ReconReport};
pub use schema::{SignRule, SourceSchema};
pub use truth::TruthSchema;
pub use workbook::{Workbook, WorkbookError};
