//! The tzinfo-style adapter.
//!
//! [`TimeZone`] wraps one lazily-computed [`ZoneProcessor`] behind the
//! interface a host date/time library expects from a pluggable
//! timezone object: offsets and abbreviation at an instant, and
//! local-to-UTC conversion with PEP-495 `fold` semantics.

use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;

use crate::datetime::LocalDateTime;
use crate::processor::{OffsetInfo, TransitionDirection, ZoneProcessor};
use crate::types::ZoneInfo;
use crate::ZoneResult;

/// A local wall time paired with the fold a round-trip must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedLocal {
    pub datetime: LocalDateTime,
    /// 0 for the first occurrence of a repeated wall time, 1 for the
    /// second.
    pub fold: u8,
}

/// The capability set a host date/time library consumes.
///
/// Hosts depend on this trait; the processor itself stays
/// interface-free.
pub trait OffsetProvider {
    /// Total offset from UTC (standard plus daylight) at an instant,
    /// in seconds.
    fn utc_offset(&self, epoch_seconds: i64) -> ZoneResult<i32>;

    /// Daylight-saving component at an instant, in seconds.
    fn dst_offset(&self, epoch_seconds: i64) -> ZoneResult<i32>;

    /// Abbreviation at an instant.
    fn abbreviation(&self, epoch_seconds: i64) -> ZoneResult<String>;

    /// Epoch second of a local wall time under the given fold.
    fn epoch_for_local(&self, local: LocalDateTime, fold: u8) -> ZoneResult<i64>;
}

/// A timezone object bound to one compiled zone record.
///
/// Clones are handles to the same underlying processor, so a year
/// cache materialised through one handle is visible to every other.
/// The handle is single-threaded by construction; a caller that wants
/// a private cache (one per thread, say) builds a fresh adapter with
/// [`TimeZone::new`] instead of cloning.
#[derive(Debug, Clone)]
pub struct TimeZone {
    info: &'static ZoneInfo,
    processor: Rc<RefCell<ZoneProcessor>>,
}

impl TimeZone {
    /// Create an adapter with its own processor over the given record.
    pub fn new(info: &'static ZoneInfo) -> Self {
        Self {
            info,
            processor: Rc::new(RefCell::new(ZoneProcessor::new(info))),
        }
    }

    /// The year currently held by the shared processor cache, if any.
    pub fn cached_year(&self) -> Option<i16> {
        self.processor.borrow().cached_year()
    }

    /// The bound record.
    pub fn info(&self) -> &'static ZoneInfo {
        self.info
    }

    /// The full zone name; a link reports its own name.
    pub fn tzfullname(&self) -> &'static str {
        self.info.name
    }

    /// The name of the record the data comes from.
    pub fn targetname(&self) -> &'static str {
        self.info.data().name
    }

    /// Whether the bound record is a link.
    pub fn is_link(&self) -> bool {
        self.info.is_link()
    }

    /// Offsets, abbreviation and fold governing an instant.
    pub fn offset_info(&self, epoch_seconds: i64) -> ZoneResult<OffsetInfo> {
        self.processor.borrow_mut().offset_for_instant(epoch_seconds)
    }

    /// Total offset from UTC at an instant, in seconds.
    pub fn utcoffset(&self, epoch_seconds: i64) -> ZoneResult<i32> {
        self.offset_info(epoch_seconds).map(|info| info.total())
    }

    /// Daylight-saving component at an instant, in seconds.
    pub fn dst(&self, epoch_seconds: i64) -> ZoneResult<i32> {
        self.offset_info(epoch_seconds).map(|info| info.dst_offset)
    }

    /// Abbreviation at an instant.
    pub fn tzname(&self, epoch_seconds: i64) -> ZoneResult<String> {
        self.offset_info(epoch_seconds).map(|info| info.abbreviation)
    }

    /// Convert an instant to its local wall time, reporting the fold a
    /// call to [`Self::localize`] must use to map back.
    pub fn fromutc(&self, epoch_seconds: i64) -> ZoneResult<ZonedLocal> {
        let info = self.offset_info(epoch_seconds)?;
        Ok(ZonedLocal {
            datetime: LocalDateTime::from_local_seconds(
                epoch_seconds + i64::from(info.total()),
            ),
            fold: info.fold,
        })
    }

    /// Convert a local wall time to its epoch second. Gaps and
    /// overlaps are handled, not reported: `fold` picks which of the
    /// two mappings applies.
    pub fn localize(&self, local: LocalDateTime, fold: u8) -> ZoneResult<i64> {
        let info = self
            .processor
            .borrow_mut()
            .offset_for_local(local, fold)?;
        Ok(local.normalized().as_local_seconds() - i64::from(info.total()))
    }

    /// The epoch second of the adjacent real offset change.
    pub fn transition(
        &self,
        epoch_seconds: i64,
        direction: TransitionDirection,
    ) -> ZoneResult<Option<i64>> {
        self.processor
            .borrow_mut()
            .transition(epoch_seconds, direction)
    }
}

/// Equality is by zone name.
impl PartialEq for TimeZone {
    fn eq(&self, other: &Self) -> bool {
        self.info.name == other.info.name
    }
}

impl Eq for TimeZone {}

impl OffsetProvider for TimeZone {
    fn utc_offset(&self, epoch_seconds: i64) -> ZoneResult<i32> {
        self.utcoffset(epoch_seconds)
    }

    fn dst_offset(&self, epoch_seconds: i64) -> ZoneResult<i32> {
        self.dst(epoch_seconds)
    }

    fn abbreviation(&self, epoch_seconds: i64) -> ZoneResult<String> {
        self.tzname(epoch_seconds)
    }

    fn epoch_for_local(&self, local: LocalDateTime, fold: u8) -> ZoneResult<i64> {
        self.localize(local, fold)
    }
}
