//! Client-side caches for inspecting a remote composition.
//!
//! Everything here lives for one connection with the inspection agent:
//!
//! - [`NodeParameterCache`]: parameter snapshots per node, fetched on first
//!   access and deduplicated across concurrent callers.
//! - [`ParameterGroupItem`]: composite values that page in their elements on
//!   demand through an [`ElementSource`].
//! - [`RecompositionStateReadCache`]: state reads per recomposition, retained
//!   either for every composable or for the selected one only
//!   (see [`StateReadMode`]).
//! - [`Session`]: ties the caches to one [`SessionScope`] and routes pushed
//!   agent events into them.
//!
//! Public accessors never fail: transport errors are logged through `tracing`
//! and surface as "no data".

mod config;
mod error;
mod flight;
mod node_cache;
pub mod params;
pub mod recomposition;
mod scope;
mod session;
#[cfg(test)]
mod test_support;

pub use config::{ConfigError, InspectorSettings, StateReadMode};
pub use error::{FetchError, Result};
pub use node_cache::NodeParameterCache;
pub use params::{
	ElementSource, ExpansionState, ParameterGroupItem, ParameterItem, ParameterNode, ParameterReference, ParameterTree,
	ShowMoreElementsItem,
};
pub use recomposition::{RecompositionKey, RecompositionStateReadCache, StateRead, StateReadEntry, TraceFrame};
pub use scope::SessionScope;
pub use session::{Session, SpawnRouterError};
