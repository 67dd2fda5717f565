//! # TRIZ Taxonomy
//!
//! The fixed TRIZ catalogs: 39 engineering parameters, 40 inventive
//! principles, and the classical 39x39 contradiction matrix, embedded as
//! static data and loaded exactly once per process.
//!
//! The matrix is a *directed* mapping: the row is the parameter being
//! improved, the column the parameter that degrades. No symmetry is assumed
//! or enforced.
//!
//! ## Example
//!
//! ```no_run
//! use triz_taxonomy::{Catalog, Result};
//!
//! fn main() -> Result<()> {
//!     let catalog = Catalog::load()?;
//!     let speed = catalog.parameter_by_name("speed")?;
//!     println!("#{}: {}", speed.id, speed.description);
//!     Ok(())
//! }
//! ```

mod catalog;
mod error;
mod matrix;
mod types;

pub use catalog::Catalog;
pub use error::{Result, TaxonomyError};
pub use matrix::ContradictionMatrix;
pub use types::{Parameter, Principle};
