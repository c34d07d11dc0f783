//! # Traveler Graph Model
//!
//! Plain data types for a traveler's fact graph: typed nodes, the edges
//! between them, and the profile that owns both.
//!
//! Design rule: no locks, no I/O here. Merge and bookkeeping rules are
//! methods on `Profile`; the store decides who may call them and when.

pub mod node;
pub mod edge;
pub mod payload;
pub mod profile;
pub mod value;
pub mod property_map;

pub use node::{Node, NodeId, NodeType};
pub use edge::{Edge, INFLUENCED_BY, RELATED};
pub use payload::{
    Budget, Interests, Merge, NodePayload, PreviousTrip, TravelPreferences, Visa,
};
pub use profile::{NodeMap, Profile, UserId};
pub use value::Value;
pub use property_map::{PropertyMap, props};
