pub mod fetch;
pub mod store;

pub use fetch::{FetchError, FetchedResponse, Fetcher, OutgoingRequest};
pub use store::{ComponentStore, InMemoryComponentStore, StoreError};
