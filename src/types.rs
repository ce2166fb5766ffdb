//! The compiled zone record model.
//!
//! These types mirror, field for field, the constants an external zone
//! database compiler emits. They are passive: every reference is
//! `'static`, nothing is mutated after load, and the graph is a DAG
//! (`ZoneInfo` → `ZoneEra` → `ZonePolicy` → `ZoneRule`; a link
//! `ZoneInfo` points at its target `ZoneInfo`).

use alloc::string::String;
use core::fmt::Write;

use crate::datetime::LocalDateTime;
use crate::utils;

/// Sentinel year for a bound open toward the infinite past.
pub const MIN_YEAR: i16 = i16::MIN;

/// Sentinel year for a bound open toward the infinite future.
pub const MAX_YEAR: i16 = i16::MAX;

/// Database-wide metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneContext {
    /// The IANA tz database version the records were compiled from.
    pub tzdb_version: &'static str,
    /// First year covered by the compiled records (inclusive).
    pub start_year: i16,
    /// Last year covered by the compiled records (exclusive).
    pub until_year: i16,
    /// The year compact 8- or 16-bit year offsets in storage formats
    /// are measured against. Informational for this in-memory layout.
    pub base_epoch_year: i16,
}

/// The frame a rule or era boundary time is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// Local wall-clock time, including any daylight saving in effect.
    Wall,
    /// Local standard time, daylight saving excluded.
    Standard,
    /// Universal time.
    Universal,
}

/// One recurrence rule within a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRule {
    /// First calendar year the rule applies in (inclusive).
    pub from_year: i16,
    /// Last calendar year the rule applies in (inclusive).
    pub to_year: i16,
    /// Month of the transition, 1 through 12.
    pub month: u8,
    /// Day-of-month selector; `0` selects by weekday alone (the last
    /// occurrence of [`Self::day_of_week`] in the month).
    pub day_of_month: i8,
    /// Weekday selector, 1 = Monday through 7 = Sunday; `0` means the
    /// exact [`Self::day_of_month`]. With both set, the transition
    /// falls on the first such weekday on or after the day.
    pub day_of_week: u8,
    /// Transition time of day in seconds since local midnight.
    pub at_seconds: i32,
    /// The frame [`Self::at_seconds`] is expressed in.
    pub at_kind: TimeKind,
    /// Seconds of daylight saving added to standard time while the rule
    /// is in effect.
    pub save_seconds: i32,
    /// Substitution for `%s` in an era's abbreviation format. Empty for
    /// the tz database's `-`.
    pub letter: &'static str,
}

impl ZoneRule {
    /// Whether this rule applies in the given calendar year.
    pub fn applies_in(&self, year: i16) -> bool {
        self.from_year <= year && year <= self.to_year
    }

    /// The rule's transition moment in the given year, in the frame
    /// declared by [`Self::at_kind`].
    pub(crate) fn datetime_in(&self, year: i16) -> LocalDateTime {
        let y = i32::from(year);
        let month_start = utils::epoch_days_from_ymd(y, self.month, 1);
        let days = if self.day_of_week == 0 {
            month_start + i32::from(self.day_of_month) - 1
        } else if self.day_of_month == 0 {
            let leap = utils::in_leap_year(y);
            let mut day = month_start + i32::from(utils::days_in_month(self.month, leap)) - 1;
            while utils::day_of_week(day) != self.day_of_week {
                day -= 1;
            }
            day
        } else {
            let mut day = month_start + i32::from(self.day_of_month) - 1;
            while utils::day_of_week(day) != self.day_of_week {
                day += 1;
            }
            day
        };
        let (yy, mm, dd) = utils::epoch_days_to_ymd(days);
        LocalDateTime::new(yy as i16, mm, dd, self.at_seconds).normalized()
    }
}

/// An ordered list of recurrence rules sharing a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonePolicy {
    pub name: &'static str,
    pub rules: &'static [ZoneRule],
}

impl ZonePolicy {
    /// Letter of the earliest rule with a zero saving.
    ///
    /// Used when an era switches to this policy before any of its rules
    /// has ever fired: standard time is assumed and the letter comes
    /// from the earliest standard-time rule.
    pub(crate) fn initial_letter(&self) -> &'static str {
        self.rules
            .iter()
            .filter(|rule| rule.save_seconds == 0)
            .min_by_key(|rule| (rule.from_year, rule.month))
            .map(|rule| rule.letter)
            .unwrap_or("")
    }
}

/// How an era derives its daylight-saving component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraRules {
    /// Pure standard time.
    None,
    /// A fixed daylight saving in seconds for the whole era.
    Fixed(i32),
    /// Savings governed by a named rule policy.
    Policy(&'static ZonePolicy),
}

/// One row of a zone's history.
///
/// The era is active for instants strictly less than its `until` bound,
/// after conversion into the frame the comparison is made in. Eras are
/// stored in strictly increasing order of that bound; the first era's
/// implicit lower bound is the infinite past and the last era's upper
/// bound the infinite future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneEra {
    /// Standard UTC offset in seconds.
    pub std_offset_seconds: i32,
    /// Daylight-saving derivation for the era.
    pub rules: EraRules,
    /// Abbreviation template: a literal, a `std/dst` pair, a `%s`
    /// substitution target, or `%z` for a numeric offset.
    pub format: &'static str,
    pub until_year: i16,
    pub until_month: u8,
    pub until_day: u8,
    pub until_seconds: i32,
    pub until_kind: TimeKind,
}

impl ZoneEra {
    /// The era's upper bound as a date tuple in [`Self::until_kind`]'s
    /// frame.
    pub(crate) fn until_datetime(&self) -> LocalDateTime {
        LocalDateTime::new(
            self.until_year,
            self.until_month,
            self.until_day,
            self.until_seconds,
        )
        .normalized()
    }

    /// The fixed daylight saving of the era, zero for policy eras.
    pub(crate) fn fixed_save_seconds(&self) -> i32 {
        match self.rules {
            EraRules::Fixed(seconds) => seconds,
            EraRules::None | EraRules::Policy(_) => 0,
        }
    }
}

/// A zone's identity: either a true zone with its own eras, or a link
/// borrowing another zone's era list.
#[derive(Debug)]
pub struct ZoneInfo {
    /// Full IANA name, e.g. `America/Los_Angeles`.
    pub name: &'static str,
    /// The owning database context.
    pub context: &'static ZoneContext,
    /// The zone's eras. Empty for links.
    pub eras: &'static [ZoneEra],
    /// The link target, `None` for true zones. Links never chain.
    pub target: Option<&'static ZoneInfo>,
    /// Tight upper bound on active transitions per cached year, emitted
    /// by the compiler. Exceeding it at runtime is a data bug.
    pub transition_buf_size: u8,
}

impl ZoneInfo {
    /// Whether this record is a link.
    pub fn is_link(&self) -> bool {
        self.target.is_some()
    }

    /// The record whose eras back this zone: the link target, or the
    /// zone itself.
    pub fn data(&'static self) -> &'static ZoneInfo {
        self.target.unwrap_or(self)
    }
}

/// Render an era's abbreviation template.
///
/// `%s` substitutes the governing rule's letter, a `std/dst` pair picks
/// by the daylight component, `%z` renders the total offset numerically,
/// and anything else is literal.
pub(crate) fn format_abbreviation(
    format: &str,
    letter: &str,
    total_offset: i32,
    dst_seconds: i32,
) -> String {
    if format.contains("%s") {
        return format.replace("%s", letter);
    }
    if format.contains("%z") {
        return offset_to_string(total_offset);
    }
    if let Some((std, dst)) = format.split_once('/') {
        return if dst_seconds == 0 {
            String::from(std)
        } else {
            String::from(dst)
        };
    }
    String::from(format)
}

/// Renders an offset as `+hh`, `-hh`, `+hhmm` or `-hhmm`.
fn offset_to_string(offset: i32) -> String {
    let mut output = String::new();
    let sign = if offset < 0 { '-' } else { '+' };
    let hour = offset.abs().div_euclid(3_600);
    let minute = offset.abs().rem_euclid(3_600).div_euclid(60);
    // The template shape cannot fail to render into a String.
    let _ = write!(&mut output, "{sign}{hour:02}");
    if minute > 0 {
        let _ = write!(&mut output, "{minute:02}");
    }
    output
}
