//! Birthday lookups and the broadcast recipient rule.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::{
    error::{Error, Result},
    session::UserId,
};

/// A calendar day without a year, written `DD.MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayMonth {
    day: u32,
    month: u32,
}

impl DayMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
        }
    }

    /// This day in `year`; `None` for 29.02 outside leap years.
    pub fn in_year(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

impl FromStr for DayMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid birthday {s:?}, expected DD.MM"));
        let (day, month) = s.trim().split_once('.').ok_or_else(invalid)?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        // 2000 is a leap year, so 29.02 is accepted.
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(invalid)?;
        Ok(Self { day, month })
    }
}

impl fmt::Display for DayMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.day, self.month)
    }
}

/// Birthdays keyed by the person's folder display name.
#[derive(Debug, Clone)]
pub struct BirthdayBook {
    entries: BTreeMap<String, DayMonth>,
    offset: FixedOffset,
    broadcast_at: NaiveTime,
}

impl BirthdayBook {
    pub fn new(
        birthdays: &BTreeMap<String, String>,
        utc_offset_hours: i32,
        broadcast_hour: u32,
        broadcast_minute: u32,
    ) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!("invalid UTC offset: {utc_offset_hours} hours"))
        })?;
        let broadcast_at = NaiveTime::from_hms_opt(broadcast_hour, broadcast_minute, 0)
            .ok_or_else(|| {
                Error::Config(format!(
                    "invalid broadcast time {broadcast_hour:02}:{broadcast_minute:02}"
                ))
            })?;

        let entries = birthdays
            .iter()
            .map(|(name, date)| Ok((name.clone(), date.parse()?)))
            .collect::<Result<_>>()?;

        Ok(Self {
            entries,
            offset,
            broadcast_at,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Today's date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Names whose birthday falls on `date`, sorted.
    pub fn on(&self, date: NaiveDate) -> Vec<&str> {
        let wanted = DayMonth::of(date);
        self.entries
            .iter()
            .filter(|(_, day)| **day == wanted)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Daily broadcast time with its offset, e.g. `09:30 (UTC+03:00)`.
    pub fn schedule_label(&self) -> String {
        format!("{} (UTC{})", self.broadcast_at.format("%H:%M"), self.offset)
    }
}

/// Users that should receive the daily birthday broadcast: every
/// authorized user that has not opted out. Sorted and deduplicated.
pub fn broadcast_recipients<I>(authorized: I, opted_in: impl Fn(UserId) -> bool) -> Vec<UserId>
where
    I: IntoIterator<Item = UserId>,
{
    let mut recipients: Vec<UserId> = authorized
        .into_iter()
        .filter(|&user| opted_in(user))
        .collect();
    recipients.sort_unstable();
    recipients.dedup();
    recipients
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn book(entries: &[(&str, &str)], offset: i32) -> BirthdayBook {
        let map = entries
            .iter()
            .map(|(name, date)| (name.to_string(), date.to_string()))
            .collect();
        BirthdayBook::new(&map, offset, 9, 30).unwrap()
    }

    #[test]
    fn parses_day_month() {
        assert_eq!("01.02".parse::<DayMonth>().unwrap().to_string(), "01.02");
        assert_eq!("29.02".parse::<DayMonth>().unwrap().to_string(), "29.02");
        for bad in ["1-2", "32.01", "10.13", "00.05", "x.y", ""] {
            assert!(bad.parse::<DayMonth>().is_err(), "{bad}");
        }
    }

    #[test]
    fn leap_day_only_in_leap_years() {
        let leap: DayMonth = "29.02".parse().unwrap();
        assert_eq!(leap.in_year(2028), NaiveDate::from_ymd_opt(2028, 2, 29));
        assert_eq!(leap.in_year(2027), None);
    }

    #[test]
    fn lists_names_for_a_day() {
        let book = book(
            &[
                ("Petrov Ivan 01.02", "01.02"),
                ("Ivanov Petr 01.02", "01.02"),
                ("Sidorov Oleg 05.05", "05.05"),
            ],
            3,
        );
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(book.on(date), vec!["Ivanov Petr 01.02", "Petrov Ivan 01.02"]);
        assert!(book.on(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).is_empty());
    }

    #[test]
    fn local_date_respects_offset() {
        let book = book(&[], 3);
        let late_utc = Utc.with_ymd_and_hms(2026, 1, 31, 22, 0, 0).unwrap();
        assert_eq!(
            book.local_date(late_utc),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        let map = BTreeMap::from([("A".to_string(), "31.02".to_string())]);
        assert!(BirthdayBook::new(&map, 3, 0, 0).is_err());
        assert!(BirthdayBook::new(&BTreeMap::new(), 30, 0, 0).is_err());
        assert!(BirthdayBook::new(&BTreeMap::new(), 3, 24, 0).is_err());
    }

    #[test]
    fn schedule_label_shows_offset() {
        assert_eq!(book(&[], 3).schedule_label(), "09:30 (UTC+03:00)");
    }

    #[test]
    fn recipients_are_opted_in_authorized_users() {
        let recipients = broadcast_recipients([5, 3, 9, 3], |user| user != 9);
        assert_eq!(recipients, vec![3, 5]);
    }
}
