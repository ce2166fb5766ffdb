//! The zone processor.
//!
//! A [`ZoneProcessor`] binds to one compiled zone record and, for one
//! requested year at a time, materialises the year's active transitions
//! into a bounded buffer. Queries then reduce to an ordered scan: the
//! governing transition of an instant is the latest one whose UTC start
//! is at or before it, and a local wall time is resolved by interval
//! membership against the transitions' wall-frame spans (yielding the
//! gap/overlap classification that `fold` disambiguates).
//!
//! Recomputation walks the zone's eras clipped to a fourteen-month
//! window around the year, expands each era's rule policy into
//! candidate transitions, and fixes every candidate up into all three
//! frames (wall, standard, universal) using the offsets in effect just
//! before it.

use alloc::string::String;
use alloc::vec::Vec;

use crate::datetime::LocalDateTime;
use crate::error::ZoneError;
use crate::types::{format_abbreviation, EraRules, TimeKind, ZoneEra, ZoneInfo};
use crate::utils;
use crate::ZoneResult;

/// Upper bound on eras intersecting one recompute window.
pub(crate) const MAX_MATCHING_ERAS: usize = 4;

/// Upper bound on transitions accumulated during one recompute.
pub(crate) const MAX_CANDIDATES: usize = 32;

/// The direction of a [`ZoneProcessor::transition`] search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDirection {
    Next,
    Previous,
}

/// The result of an offset query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetInfo {
    /// Standard UTC offset in seconds.
    pub utc_offset: i32,
    /// Daylight-saving component in seconds.
    pub dst_offset: i32,
    /// Resolved abbreviation, e.g. `PDT`.
    pub abbreviation: String,
    /// For instant queries, 1 when the instant's wall time is the
    /// second occurrence of a repeated local time; for local queries,
    /// the disambiguation that was applied.
    pub fold: u8,
}

impl OffsetInfo {
    /// The total offset from UTC in seconds.
    pub fn total(&self) -> i32 {
        self.utc_offset + self.dst_offset
    }
}

/// An era clipped to the processor's working window.
#[derive(Debug, Clone, Copy)]
struct MatchingEra {
    era: &'static ZoneEra,
    /// The previous era's upper bound (or the clipped window edge),
    /// expressed in `start_kind`'s frame.
    start: LocalDateTime,
    start_kind: TimeKind,
    until: LocalDateTime,
    until_kind: TimeKind,
}

/// A concrete offset change, fixed up into the universal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transition {
    /// The UTC instant the transition takes effect.
    start_u: i64,
    utc_offset: i32,
    dst_offset: i32,
    abbreviation: String,
}

impl Transition {
    fn total(&self) -> i64 {
        i64::from(self.utc_offset) + i64::from(self.dst_offset)
    }

    /// The start instant expressed in the transition's own wall frame.
    fn start_w(&self) -> i64 {
        self.start_u + self.total()
    }
}

/// A rule occurrence not yet fixed up.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    time: LocalDateTime,
    kind: TimeKind,
    save_seconds: i32,
    letter: &'static str,
}

/// One moment expressed in all three frames, as frame-local epoch
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frames {
    w: i64,
    s: i64,
    u: i64,
}

impl Frames {
    fn in_kind(&self, kind: TimeKind) -> i64 {
        match kind {
            TimeKind::Wall => self.w,
            TimeKind::Standard => self.s,
            TimeKind::Universal => self.u,
        }
    }
}

/// Expand a tuple into all three frames given the offsets in effect
/// just before it. The conversions are purely additive: wall and
/// standard differ by `dst`, standard and universal by `utc`.
fn expand(dt: LocalDateTime, kind: TimeKind, utc: i32, dst: i32) -> Frames {
    let t = dt.as_local_seconds();
    let utc = i64::from(utc);
    let dst = i64::from(dst);
    match kind {
        TimeKind::Wall => Frames {
            w: t,
            s: t - dst,
            u: t - dst - utc,
        },
        TimeKind::Standard => Frames {
            w: t + dst,
            s: t,
            u: t - utc,
        },
        TimeKind::Universal => Frames {
            w: t + utc + dst,
            s: t + utc,
            u: t,
        },
    }
}

/// An on-demand transition engine bound to one zone record.
///
/// The processor owns mutable buffers; concurrent use of a single
/// instance is not supported. Callers either serialise access or
/// instantiate one processor per thread.
#[derive(Debug, Clone)]
pub struct ZoneProcessor {
    /// The bound record, possibly a link.
    zone: &'static ZoneInfo,
    /// The record backing the data: the link target, or `zone` itself.
    data: &'static ZoneInfo,
    /// The cached year, `None` while no valid cache exists.
    year: Option<i16>,
    /// Active transitions of the cached year, ascending by UTC start.
    transitions: Vec<Transition>,
}

impl ZoneProcessor {
    /// Create a processor bound to the given zone. A link is followed
    /// once; the link's own name remains the display name.
    pub fn new(zone: &'static ZoneInfo) -> Self {
        Self {
            zone,
            data: zone.data(),
            year: None,
            transitions: Vec::new(),
        }
    }

    /// Rebind to another zone, discarding any cached year.
    pub fn bind(&mut self, zone: &'static ZoneInfo) {
        if core::ptr::eq(self.zone, zone) {
            return;
        }
        self.zone = zone;
        self.data = zone.data();
        self.year = None;
        self.transitions.clear();
    }

    /// The bound record's display name.
    pub fn name(&self) -> &'static str {
        self.zone.name
    }

    /// The name of the record the data comes from. Differs from
    /// [`Self::name`] only for links.
    pub fn target_name(&self) -> &'static str {
        self.data.name
    }

    /// Whether the bound record is a link.
    pub fn is_link(&self) -> bool {
        self.zone.is_link()
    }

    /// The currently cached year, `None` until a query has succeeded
    /// or after a rebind.
    pub fn cached_year(&self) -> Option<i16> {
        self.year
    }

    /// Resolve the offsets and abbreviation governing a UTC instant.
    pub fn offset_for_instant(&mut self, epoch_seconds: i64) -> ZoneResult<OffsetInfo> {
        let year = utils::year_for_epoch_seconds(epoch_seconds);
        self.ensure_year(year)?;
        let mut index = 0;
        for (i, transition) in self.transitions.iter().enumerate() {
            if transition.start_u <= epoch_seconds {
                index = i;
            } else {
                break;
            }
        }
        let transition = &self.transitions[index];
        // The instant falls in an overlap when the previous regime's
        // clock ran past this transition's wall start.
        let fold = if index > 0 {
            let shrink = self.transitions[index - 1].total() - transition.total();
            u8::from(shrink > 0 && epoch_seconds - transition.start_u < shrink)
        } else {
            0
        };
        Ok(self.info_for(transition, fold))
    }

    /// Resolve a local wall time, honouring `fold` in gaps and
    /// overlaps: in an overlap `fold == 0` selects the earlier regime;
    /// in a gap `fold == 0` maps through the later one (reversing the
    /// mapping, so a skipped wall time lands after the transition).
    pub fn offset_for_local(&mut self, local: LocalDateTime, fold: u8) -> ZoneResult<OffsetInfo> {
        let local = local.normalized();
        let mut year = i32::from(local.year);
        self.ensure_year(year)?;
        let local_secs = local.as_local_seconds();
        // A wall time just past New Year can precede the first cached
        // wall start; the adjacent year owns it.
        if local_secs < self.transitions[0].start_w()
            && year - 1 >= i32::from(self.data.context.start_year)
        {
            year -= 1;
            self.ensure_year(year)?;
        }

        let n = self.transitions.len();
        let until_w = |i: usize| {
            if i + 1 < n {
                self.transitions[i + 1].start_u + self.transitions[i].total()
            } else {
                i64::MAX
            }
        };

        let mut first_hit = None;
        let mut second_hit = None;
        for i in 0..n {
            let contains =
                self.transitions[i].start_w() <= local_secs && local_secs < until_w(i);
            if contains {
                if first_hit.is_none() {
                    first_hit = Some(i);
                } else {
                    second_hit = Some(i);
                }
            }
        }

        let chosen = match (first_hit, second_hit) {
            // Overlap: the wall time occurred under both regimes.
            (Some(earlier), Some(later)) => {
                if fold == 0 {
                    earlier
                } else {
                    later
                }
            }
            (Some(only), None) => only,
            // Gap: the wall time never occurred; bracket it.
            (None, _) => {
                match self
                    .transitions
                    .iter()
                    .position(|t| t.start_w() > local_secs)
                {
                    Some(0) | None => 0,
                    Some(after) => {
                        if fold == 0 {
                            after
                        } else {
                            after - 1
                        }
                    }
                }
            }
        };
        Ok(self.info_for(&self.transitions[chosen], fold))
    }

    /// Ensure the given year is cached and scan its active transitions
    /// as `(utc_start, utc_offset, dst_offset)` triples, ascending by
    /// UTC start.
    pub fn active_transitions(
        &mut self,
        year: i32,
    ) -> ZoneResult<impl Iterator<Item = (i64, i32, i32)> + '_> {
        self.ensure_year(year)?;
        Ok(self
            .transitions
            .iter()
            .map(|t| (t.start_u, t.utc_offset, t.dst_offset)))
    }

    /// The epoch second of the nearest real offset change after (or
    /// before) the given instant, searching the instant's year and one
    /// adjacent year.
    pub fn transition(
        &mut self,
        epoch_seconds: i64,
        direction: TransitionDirection,
    ) -> ZoneResult<Option<i64>> {
        let year = utils::year_for_epoch_seconds(epoch_seconds);
        self.ensure_year(year)?;
        let context = self.data.context;
        match direction {
            TransitionDirection::Next => {
                if let Some(at) = self.next_change(epoch_seconds) {
                    return Ok(Some(at));
                }
                if year + 1 >= i32::from(context.until_year) {
                    return Ok(None);
                }
                self.ensure_year(year + 1)?;
                Ok(self.next_change(epoch_seconds))
            }
            TransitionDirection::Previous => {
                if let Some(at) = self.previous_change(epoch_seconds) {
                    return Ok(Some(at));
                }
                if year - 1 < i32::from(context.start_year) {
                    return Ok(None);
                }
                self.ensure_year(year - 1)?;
                Ok(self.previous_change(epoch_seconds))
            }
        }
    }

    fn info_for(&self, transition: &Transition, fold: u8) -> OffsetInfo {
        OffsetInfo {
            utc_offset: transition.utc_offset,
            dst_offset: transition.dst_offset,
            abbreviation: transition.abbreviation.clone(),
            fold,
        }
    }

    /// Whether buffer entry `i` changes anything observable relative to
    /// its predecessor. Era-start entries at the window edge often do
    /// not; they only re-anchor the scan.
    fn is_change(&self, i: usize) -> bool {
        let prev = &self.transitions[i - 1];
        let curr = &self.transitions[i];
        curr.utc_offset != prev.utc_offset
            || curr.dst_offset != prev.dst_offset
            || curr.abbreviation != prev.abbreviation
    }

    fn next_change(&self, epoch_seconds: i64) -> Option<i64> {
        (1..self.transitions.len())
            .find(|&i| self.transitions[i].start_u > epoch_seconds && self.is_change(i))
            .map(|i| self.transitions[i].start_u)
    }

    fn previous_change(&self, epoch_seconds: i64) -> Option<i64> {
        (1..self.transitions.len())
            .rev()
            .find(|&i| self.transitions[i].start_u < epoch_seconds && self.is_change(i))
            .map(|i| self.transitions[i].start_u)
    }

    /// Make sure the cache holds the given year, recomputing if needed.
    ///
    /// A failed recompute leaves the cache invalid so the next query
    /// retries cleanly.
    fn ensure_year(&mut self, year: i32) -> ZoneResult<()> {
        let context = self.data.context;
        if year < i32::from(context.start_year) || year >= i32::from(context.until_year) {
            return Err(ZoneError::out_of_range());
        }
        let year = year as i16;
        if self.year == Some(year) {
            return Ok(());
        }
        self.year = None;
        self.transitions.clear();
        self.compute_transitions(year)?;
        self.year = Some(year);
        Ok(())
    }

    fn compute_transitions(&mut self, year: i16) -> ZoneResult<()> {
        #[cfg(feature = "log")]
        log::trace!("{}: computing transitions for {}", self.data.name, year);

        let matches = self.find_matching_eras(year)?;
        let mut all: Vec<Transition> = Vec::new();

        // The first-era seed: standard offset with no daylight saving.
        let mut prev_utc = matches[0].era.std_offset_seconds;
        let mut prev_dst = 0;
        for matching in &matches {
            (prev_utc, prev_dst) = self.process_match(matching, year, prev_utc, prev_dst, &mut all)?;
        }
        if all.is_empty() {
            return Err(ZoneError::bad_zone_data().with_message("no transitions computed"));
        }

        // Keep transitions starting inside the year, anchored by the
        // latest one at or before the year's start so the year's first
        // query has a governing transition.
        let year_start = utils::epoch_seconds_for_year(i32::from(year));
        let year_end = utils::epoch_seconds_for_year(i32::from(year) + 1);
        let mut anchor = 0;
        for (i, transition) in all.iter().enumerate() {
            if transition.start_u <= year_start {
                anchor = i;
            }
        }
        let active = all
            .drain(..)
            .skip(anchor)
            .filter(|t| t.start_u < year_end)
            .collect::<Vec<_>>();
        if active.len() > usize::from(self.data.transition_buf_size) {
            return Err(ZoneError::bad_zone_data().with_message("transition buffer exceeded"));
        }
        self.transitions = active;
        Ok(())
    }

    /// Walk the zone's eras and keep those overlapping the fourteen
    /// month window around the year, clipped to it.
    ///
    /// Era bounds are stored in modifier-dependent frames; comparison
    /// against the wall-frame window ignores the frames, which is safe
    /// because era bounds sit well away from the window edges relative
    /// to any offset.
    fn find_matching_eras(&self, year: i16) -> ZoneResult<Vec<MatchingEra>> {
        let window_lo = LocalDateTime::new(year - 1, 12, 1, 0);
        let window_hi = LocalDateTime::new(year + 1, 2, 1, 0);
        let lo_secs = window_lo.as_local_seconds();
        let hi_secs = window_hi.as_local_seconds();

        let mut matches: Vec<MatchingEra> = Vec::new();
        let mut prev_until: Option<(LocalDateTime, TimeKind)> = None;
        let mut prev_secs = i64::MIN;
        for era in self.data.eras {
            let until = era.until_datetime();
            let until_secs = until.as_local_seconds();
            if until_secs <= prev_secs {
                return Err(ZoneError::bad_zone_data().with_message("era bounds not increasing"));
            }
            if prev_secs < hi_secs && until_secs > lo_secs {
                if matches.len() == MAX_MATCHING_ERAS {
                    return Err(
                        ZoneError::bad_zone_data().with_message("matching era bound exceeded")
                    );
                }
                let (start, start_kind) = match prev_until {
                    Some((dt, kind)) if dt.as_local_seconds() >= lo_secs => (dt, kind),
                    _ => (window_lo, TimeKind::Wall),
                };
                let (until, until_kind) = if until_secs <= hi_secs {
                    (until, era.until_kind)
                } else {
                    (window_hi, TimeKind::Wall)
                };
                matches.push(MatchingEra {
                    era,
                    start,
                    start_kind,
                    until,
                    until_kind,
                });
            }
            prev_until = Some((until, era.until_kind));
            prev_secs = until_secs;
        }
        if matches.is_empty() {
            return Err(ZoneError::bad_zone_data().with_message("no era covers the year"));
        }
        Ok(matches)
    }

    /// Expand one matching era's rules into candidates, fix them up,
    /// and append the era's transitions to `output`. Returns the
    /// offsets in effect when the era is left.
    fn process_match(
        &self,
        matching: &MatchingEra,
        year: i16,
        prev_utc: i32,
        prev_dst: i32,
        output: &mut Vec<Transition>,
    ) -> ZoneResult<(i32, i32)> {
        let era = matching.era;
        let start_frames = expand(matching.start, matching.start_kind, prev_utc, prev_dst);
        let start_raw = matching.start.as_local_seconds();
        let until_raw = matching.until.as_local_seconds();

        let mut run_utc = prev_utc;
        let mut run_dst = prev_dst;

        // Data for the synthetic transition at the era's start. A rule
        // that fired before the era began seeds it; failing that, a
        // policy era assumes standard time with the letter of the
        // earliest standard rule.
        let mut start_save = era.fixed_save_seconds();
        let mut start_letter = match era.rules {
            EraRules::Policy(policy) => policy.initial_letter(),
            EraRules::None | EraRules::Fixed(_) => "",
        };
        let mut start_done = false;

        for candidate in self.candidates_for(era, year)? {
            let mut frames = expand(candidate.time, candidate.kind, run_utc, run_dst);
            // At or beyond the era's upper bound: the next era will
            // regenerate this occurrence for itself.
            if frames.in_kind(matching.until_kind) >= until_raw {
                continue;
            }
            // A candidate landing exactly on the era's start becomes
            // the start transition, overriding the synthetic one.
            let exact = frames.w == start_frames.w
                || frames.s == start_frames.s
                || frames.u == start_frames.u;
            if exact && !start_done {
                self.push_transition(
                    output,
                    self.make_transition(era, start_frames.u, candidate.save_seconds, candidate.letter),
                )?;
                run_utc = era.std_offset_seconds;
                run_dst = candidate.save_seconds;
                start_done = true;
                continue;
            }
            if frames.in_kind(matching.start_kind) < start_raw {
                // Fired before this era began: only seeds the start.
                start_save = candidate.save_seconds;
                start_letter = candidate.letter;
                run_utc = era.std_offset_seconds;
                run_dst = candidate.save_seconds;
                continue;
            }
            if !start_done {
                self.push_transition(
                    output,
                    self.make_transition(era, start_frames.u, start_save, start_letter),
                )?;
                run_utc = era.std_offset_seconds;
                run_dst = start_save;
                start_done = true;
                // Re-expand with the offsets the era start put in effect.
                frames = expand(candidate.time, candidate.kind, run_utc, run_dst);
                if frames.in_kind(matching.until_kind) >= until_raw
                    || frames.in_kind(matching.start_kind) < start_raw
                {
                    continue;
                }
            }
            self.push_transition(
                output,
                self.make_transition(era, frames.u, candidate.save_seconds, candidate.letter),
            )?;
            run_utc = era.std_offset_seconds;
            run_dst = candidate.save_seconds;
        }

        if !start_done {
            self.push_transition(
                output,
                self.make_transition(era, start_frames.u, start_save, start_letter),
            )?;
            run_utc = era.std_offset_seconds;
            run_dst = start_save;
        }
        Ok((run_utc, run_dst))
    }

    /// Candidate occurrences of an era's rules, ordered by their native
    /// tuples. Covers the three years the window can touch plus, for
    /// rules that expired earlier, the most recent year they fired in
    /// (those only ever seed era starts).
    fn candidates_for(&self, era: &'static ZoneEra, year: i16) -> ZoneResult<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = Vec::new();
        if let EraRules::Policy(policy) = era.rules {
            for rule in policy.rules {
                let mut interior = false;
                for y in [year - 1, year, year + 1] {
                    if rule.applies_in(y) {
                        interior = true;
                        candidates.push(Candidate {
                            time: rule.datetime_in(y),
                            kind: rule.at_kind,
                            save_seconds: rule.save_seconds,
                            letter: rule.letter,
                        });
                    }
                }
                if !interior && rule.to_year < year - 1 {
                    candidates.push(Candidate {
                        time: rule.datetime_in(rule.to_year),
                        kind: rule.at_kind,
                        save_seconds: rule.save_seconds,
                        letter: rule.letter,
                    });
                }
                if candidates.len() > MAX_CANDIDATES {
                    return Err(ZoneError::bad_zone_data().with_message("candidate bound exceeded"));
                }
            }
        }
        candidates.sort_by_key(|c| c.time);
        Ok(candidates)
    }

    fn make_transition(
        &self,
        era: &'static ZoneEra,
        start_u: i64,
        save_seconds: i32,
        letter: &'static str,
    ) -> Transition {
        let utc_offset = era.std_offset_seconds;
        Transition {
            start_u,
            utc_offset,
            dst_offset: save_seconds,
            abbreviation: format_abbreviation(
                era.format,
                letter,
                utc_offset + save_seconds,
                save_seconds,
            ),
        }
    }

    /// Append in UTC order. Simultaneous transitions collapse to the
    /// later one (an era switch can coincide with a rule firing).
    fn push_transition(&self, output: &mut Vec<Transition>, transition: Transition) -> ZoneResult<()> {
        if let Some(last) = output.last_mut() {
            if transition.start_u < last.start_u {
                return Err(ZoneError::bad_zone_data().with_message("transitions out of order"));
            }
            if transition.start_u == last.start_u {
                *last = transition;
                return Ok(());
            }
        }
        if output.len() == MAX_CANDIDATES {
            return Err(ZoneError::bad_zone_data().with_message("transition bound exceeded"));
        }
        output.push(transition);
        Ok(())
    }
}
