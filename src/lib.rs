//! `zonetime` is an on-demand IANA time zone engine.
//!
//! The crate answers, for any compiled tz-database zone and any instant
//! (epoch seconds or local wall-clock components), the effective UTC
//! offset, the daylight-saving component, and the short abbreviation.
//!
//! Zone data is a passive graph of compiled records (see [`types`]): a
//! zone is a sequence of eras, each optionally referencing a policy of
//! recurrence rules. The [`processor::ZoneProcessor`] walks that graph
//! for one year at a time and materialises a small, bounded buffer of
//! concrete transitions; queries are answered by an ordered scan of
//! that buffer. [`timezone::TimeZone`] wraps a processor into a
//! tzinfo-style object with PEP-495 `fold` semantics for local times
//! that fall in a gap or an overlap.
//!
//! Producing the compiled records is the job of an external compiler;
//! this crate only defines their in-memory shape.

#![no_std]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod datetime;
pub mod error;
pub mod processor;
pub mod registry;
pub mod timezone;
pub mod types;

pub(crate) mod utils;

#[doc(inline)]
pub use error::ZoneError;

/// The `zonetime` result type.
pub type ZoneResult<T> = Result<T, ZoneError>;

pub use datetime::LocalDateTime;
pub use processor::{OffsetInfo, TransitionDirection, ZoneProcessor};
pub use registry::{ZoneManager, ZoneRegistry};
pub use timezone::{OffsetProvider, TimeZone, ZonedLocal};
pub use types::{
    EraRules, TimeKind, ZoneContext, ZoneEra, ZoneInfo, ZonePolicy, ZoneRule, MAX_YEAR, MIN_YEAR,
};
