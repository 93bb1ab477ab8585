pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod io;
pub mod paths;
pub mod phase;
pub mod relevance;
pub mod report;
pub mod root;
pub mod scan;
pub mod uat;

pub use error::{MsError, Result};
