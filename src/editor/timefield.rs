// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;

/// One of the three text fields that describe a handle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimePart {
    Minutes,
    Seconds,
    Millis,
}

impl TimePart {
    pub const ALL: [TimePart; 3] = [TimePart::Minutes, TimePart::Seconds, TimePart::Millis];

    fn index(self) -> usize {
        match self {
            TimePart::Minutes => 0,
            TimePart::Seconds => 1,
            TimePart::Millis => 2,
        }
    }

    fn width(self) -> usize {
        match self {
            TimePart::Minutes | TimePart::Seconds => 2,
            TimePart::Millis => 3,
        }
    }
}

/// A time split into minutes, seconds and milliseconds. Parts typed by a user may be out
/// of range or negative; [`TimeParts::from_seconds`] always yields canonical parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeParts {
    pub minutes: i64,
    pub seconds: i64,
    pub millis: i64,
}

impl TimeParts {
    pub fn new(minutes: i64, seconds: i64, millis: i64) -> TimeParts {
        TimeParts {
            minutes,
            seconds,
            millis,
        }
    }

    /// Splits a time in seconds. Milliseconds are rounded, and a rounding that reaches a
    /// full second carries into the seconds and minutes.
    pub fn from_seconds(t: f64) -> TimeParts {
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let mut minutes = (t / 60.0).floor() as i64;
        let mut seconds = (t % 60.0).floor() as i64;
        let mut millis = ((t - t.floor()) * 1000.0).round() as i64;
        if millis >= 1000 {
            millis -= 1000;
            seconds += 1;
        }
        if seconds >= 60 {
            seconds -= 60;
            minutes += 1;
        }
        TimeParts {
            minutes,
            seconds,
            millis,
        }
    }

    /// Builds parts from field text. Text that doesn't start with a number counts as 0.
    pub fn from_fields(minutes: &str, seconds: &str, millis: &str) -> TimeParts {
        TimeParts {
            minutes: parse_lenient(minutes),
            seconds: parse_lenient(seconds),
            millis: parse_lenient(millis),
        }
    }

    /// Parses `m:ss.mmm`, `ss.mmm` or `ss`. Missing parts are 0.
    pub fn parse(text: &str) -> TimeParts {
        let (minutes, rest) = match text.split_once(':') {
            Some((minutes, rest)) => (minutes, rest),
            None => ("", text),
        };
        let (seconds, millis) = rest.split_once('.').unwrap_or((rest, ""));
        // "1.5" means 500 ms, so the fraction is padded to three digits.
        let millis = format!("{:0<3}", millis.get(..3).unwrap_or(millis));
        TimeParts::from_fields(minutes, seconds, &millis)
    }

    pub fn to_seconds(&self) -> f64 {
        self.minutes as f64 * 60.0 + self.seconds as f64 + self.millis as f64 / 1000.0
    }

    pub fn get(&self, part: TimePart) -> i64 {
        match part {
            TimePart::Minutes => self.minutes,
            TimePart::Seconds => self.seconds,
            TimePart::Millis => self.millis,
        }
    }

    /// The zero-padded text shown in the given field.
    pub fn text(&self, part: TimePart) -> String {
        format!("{:0width$}", self.get(part), width = part.width())
    }
}

impl fmt::Display for TimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}.{:03}",
            self.minutes, self.seconds, self.millis
        )
    }
}

/// Reads a leading integer the way a browser's `parseInt` does: leading whitespace and
/// one sign are allowed, digits are read until the first non-digit, and anything without
/// digits is 0.
pub fn parse_lenient(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_i64, |value, digit| {
            value
                .saturating_mul(10)
                .saturating_add(i64::from(digit - b'0'))
        });
    if negative {
        -value
    } else {
        value
    }
}

/// The raw text of the three fields for one handle. Text is kept as typed until it is
/// committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeFieldText {
    fields: [String; 3],
}

impl TimeFieldText {
    pub fn from_parts(parts: &TimeParts) -> TimeFieldText {
        TimeFieldText {
            fields: TimePart::ALL.map(|part| parts.text(part)),
        }
    }

    pub fn get(&self, part: TimePart) -> &str {
        &self.fields[part.index()]
    }

    pub fn set(&mut self, part: TimePart, text: &str) {
        self.fields[part.index()] = text.to_string();
    }

    pub fn parts(&self) -> TimeParts {
        TimeParts::from_fields(&self.fields[0], &self.fields[1], &self.fields[2])
    }
}
