//! Message types and endpoint boundary for remote composition inspection.
//!
//! This crate describes what travels between the inspector and the agent running
//! inside the inspected process, without committing to a byte layout:
//! * [`Command`] / [`Response`]: request/reply pairs sent through a [`RemoteEndpoint`]
//! * [`Event`]: unsolicited messages pushed by the agent
//! * [`StringTable`]: per-message string pool used by every payload
//! * [`NodeIdentity`] / [`AnchorHash`]: identities scoped to one inspected process
//!
//! All message types derive serde traits so the transport can choose its own format.

#![warn(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod ids;
pub mod message;
pub mod strings;

pub use endpoint::RemoteEndpoint;
pub use error::{Error, Result};
pub use ids::{AnchorHash, ComposableNode, NodeIdentity};
pub use message::{
	AllParametersResponse, Command, Event, ParameterDetailsResponse, ParameterType, ParametersResponse, RawParameter,
	RawParameterGroup, RawRecompositionReads, RawReference, RawStateRead, RawTraceFrame, RawValue, ReferenceKind,
	Response, StateReadEvent, StateReadsResponse,
};
pub use strings::{StringEntry, StringTable};
