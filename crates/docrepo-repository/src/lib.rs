//! # docrepo-repository
//!
//! The repository layer of DocRepo: a typed CRUD, query and aggregation
//! surface over any [`DocumentStore`](docrepo_core::traits::DocumentStore)
//! that keeps the public `id` field and the store's `_id` key in sync on
//! every call.

pub mod helpers;
pub mod normalize;
pub mod pagination;
pub mod populate;
pub mod repository;

pub use normalize::{Outbound, denormalize, normalize_query};
pub use pagination::ListPlan;
pub use populate::PopulateOptions;
pub use repository::BaseRepository;
