//! Daily fire time parsed from user input

use crate::error::{Error, Result};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;

/// A wall-clock time of day, always in range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour <= 23 && minute <= 59 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Six-field cron expression firing once a day at this time
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let expr = self.cron_expression();
        Schedule::from_str(&expr).map_err(|e| Error::Schedule(format!("'{}': {}", expr, e)))
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    /// Accepts `H:M` with optional leading zeros and surrounding whitespace.
    fn from_str(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidTimeFormat(input.to_string());

        let parts: Vec<&str> = input.trim().split(':').collect();
        let [hour, minute] = parts.as_slice() else {
            return Err(invalid());
        };

        let hour: i64 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: i64 = minute.trim().parse().map_err(|_| invalid())?;

        let hour = u8::try_from(hour).map_err(|_| invalid())?;
        let minute = u8::try_from(minute).map_err(|_| invalid())?;

        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
