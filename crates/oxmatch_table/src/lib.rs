//! This crate provides the flow match table: a priority classifier over
//! [Match](oxmatch_core::r#match::Match) values with strict and best-match lookups.
mod config;
mod error;
#[cfg(feature = "shared")]
mod shared;
pub mod table;

pub use config::TableConfig;
pub use error::{TableError, TableResult};
#[cfg(feature = "shared")]
pub use shared::SharedMatchTable;
pub use table::MatchTable;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{MatchTable, TableConfig, TableError, TableResult};

    #[cfg(feature = "shared")]
    #[doc(hidden)]
    pub use crate::SharedMatchTable;
}
