//! Map aggregation for MetaMapa facts.
//!
//! # Purpose
//! Turns the fact list served by the remote API into map markers: positions
//! are normalized, facts sharing a coordinate are grouped, and each group is
//! rendered as one marker whose popup lists every member.
//!
//! # How it fits
//! A [`MapFeed`] polls a [`FactSource`] for one [`FilterCriteria`] and
//! publishes [`MapSnapshot`]s. Readers build a [`MapView`] from the latest
//! snapshot; rendering is pure and runs on every read.
//!
//! # Key invariants
//! - Grouping uses the exact normalized coordinate; there is no spatial
//!   tolerance.
//! - A fetch result is applied only if it is newer than the last applied one.
//! - Fetch failures never clear the previously published facts.
//!
//! [`FilterCriteria`]: metamapa_common::FilterCriteria

mod coords;
mod elapsed;
mod errors;
mod feed;
mod grouping;
mod markers;
mod source;
mod view;

pub use coords::{Coordinates, DEFAULT_POSITION, Placement, coordinate_value, place};
pub use elapsed::{NO_TIMESTAMP_LABEL, format_elapsed};
pub use errors::{MapError, MapResult};
pub use feed::{DEFAULT_REFRESH_INTERVAL, FeedConfig, MapFeed, MapSnapshot, SequenceGuard};
pub use grouping::{MarkerGroup, group_facts};
pub use markers::{
    Marker, MarkerColor, NavigationState, PopupAction, PopupEntry, capitalize, render_markers,
};
pub use source::FactSource;
pub use view::MapView;
