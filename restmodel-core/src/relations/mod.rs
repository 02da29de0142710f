//! Relation declarations and the loader that resolves them.
//!
//! A model declares named relations to other models. When a caller asks to
//! include a relation, the loader fetches the related entities and stores them
//! on every primary row under the relation alias:
//!
//! - **combined** relations issue one request for the whole row set, filtered
//!   by `<foreignField>[]`, and match results by key,
//! - **exclusive** relations issue one request per row, with `"@field"`
//!   params filled from that row.
//!
//! ## Example
//!
//! ```rust
//! use restmodel_core::relations::{Cardinality, FetchStrategy, RelationConfig, RelationOptions, UsingOperation};
//!
//! // articles.authorId -> users.id
//! let author = RelationConfig::from(("id", "authorId")).into_descriptor(Cardinality::One, "User");
//! assert_eq!(author.local_field, "authorId");
//!
//! // one GET /photos/:id per article
//! let photo = RelationConfig::from(
//!     RelationOptions::new()
//!         .using(UsingOperation::Get)
//!         .fetch_mode(FetchStrategy::Exclusive)
//!         .param("id", "@photoId"),
//! )
//! .into_descriptor(Cardinality::One, "Photo");
//! assert_eq!(photo.fetch_strategy, FetchStrategy::Exclusive);
//! ```

mod config;
mod loader;
mod spec;

pub use config::{RelationConfig, RelationOptions};
pub use loader::{RelationFetcher, RelationLoader, group_by, match_key, process_params};
pub use spec::{Cardinality, FetchStrategy, RelationDescriptor, UsingOperation};
