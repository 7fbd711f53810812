pub mod key;
pub mod mutation;
pub mod store;

pub use key::{Cached, QueryData, QueryKey, Resource};
pub use mutation::{Mutation, MutationKind, MutationStatus};
pub use store::{QueryCache, QueryState};
