//! Live chart label parsing
//!
//! The DATA screen exposes its latest sample as the accessible name of the
//! chart view: `index is <int>, value is <float>`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::common::{Error, Result};

const INDEX_MARKER: &str = "index is ";
const VALUE_MARKER: &str = ", value is ";

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Unanchored: trailing text after the digits, e.g. an exponent, is ignored
    PATTERN.get_or_init(|| {
        Regex::new(r"index is (\d+), value is (\d*\.\d+)").expect("chart label pattern is valid")
    })
}

/// One sample shown by the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartReading {
    pub index: u64,
    pub value: f64,
}

impl ChartReading {
    /// Parse a chart label
    ///
    /// The pattern may appear anywhere in the label.
    pub fn parse(label: &str) -> Result<Self> {
        let captures = label_pattern()
            .captures(label)
            .ok_or_else(|| Error::parse(label, "does not match 'index is <int>, value is <float>'"))?;

        let index = captures[1]
            .parse::<u64>()
            .map_err(|e| Error::parse(label, &format!("bad index: {}", e)))?;
        let value = captures[2]
            .parse::<f64>()
            .map_err(|e| Error::parse(label, &format!("bad value: {}", e)))?;

        Ok(Self { index, value })
    }

    /// Render the label the app would show for this reading
    ///
    /// Whole values keep one decimal so the label stays parseable.
    pub fn to_label(&self) -> String {
        if self.value.fract() == 0.0 {
            format!("{}{}{}{:.1}", INDEX_MARKER, self.index, VALUE_MARKER, self.value)
        } else {
            format!("{}{}{}{}", INDEX_MARKER, self.index, VALUE_MARKER, self.value)
        }
    }
}

impl fmt::Display for ChartReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} = {}", self.index, self.value)
    }
}

/// Parse the two labels of one verification
///
/// The markers are checked before the pattern so a format change is
/// reported with the fragment that went missing.
pub fn parse_pair(first: &str, second: &str) -> Result<(ChartReading, ChartReading)> {
    if !first.contains(INDEX_MARKER) {
        return Err(Error::parse(first, "missing 'index is '"));
    }
    if !second.contains(VALUE_MARKER) {
        return Err(Error::parse(second, "missing ', value is '"));
    }
    Ok((ChartReading::parse(first)?, ChartReading::parse(second)?))
}

/// Check that the chart moved on while the sensor stayed put
///
/// The value comparison assumes nobody handles the device during the run.
pub fn check_progress(first: &ChartReading, second: &ChartReading) -> Result<()> {
    if first.index >= second.index {
        return Err(Error::Assertion(format!(
            "chart index did not advance: {} then {}",
            first.index, second.index
        )));
    }
    if first.value != second.value {
        return Err(Error::Assertion(format!(
            "chart value changed between reads: {} then {}",
            first.value, second.value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        let reading = ChartReading::parse("index is 42, value is 9.81").unwrap();
        assert_eq!(reading.index, 42);
        assert_eq!(reading.value, 9.81);
    }

    #[test]
    fn test_parse_leading_dot_value() {
        let reading = ChartReading::parse("index is 7, value is .5").unwrap();
        assert_eq!(reading.value, 0.5);
    }

    #[test]
    fn test_parse_embedded_label() {
        let reading = ChartReading::parse("Chart: index is 3, value is 12.0 (live)").unwrap();
        assert_eq!(reading, ChartReading { index: 3, value: 12.0 });
    }

    #[test]
    fn test_exponent_is_not_part_of_value() {
        let reading = ChartReading::parse("index is 2, value is 1.5e3").unwrap();
        assert_eq!(reading, ChartReading { index: 2, value: 1.5 });
    }

    proptest::proptest! {
        /// Any reading survives being rendered and parsed again
        #[test]
        fn label_round_trip(index in proptest::prelude::any::<u64>(), value in 0.0f64..1e300) {
            let reading = ChartReading { index, value };
            let label = reading.to_label();
            let parsed = ChartReading::parse(&label).unwrap();
            assert_eq!(parsed, reading, "label: {}", label);
        }

        /// Labels written by the app parse to the exact digits shown
        #[test]
        fn label_digits_recovered(
            index in "[0-9]{1,18}",
            whole in "[0-9]{0,6}",
            fraction in "[0-9]{1,6}",
        ) {
            let label = format!("index is {}, value is {}.{}", index, whole, fraction);
            let expected = ChartReading {
                index: index.parse().unwrap(),
                value: format!("{}.{}", whole, fraction).parse().unwrap(),
            };

            assert_eq!(ChartReading::parse(&label).unwrap(), expected);
            let (first, second) = parse_pair(&label, &label).unwrap();
            assert_eq!((first, second), (expected, expected));
        }
    }

    #[test]
    fn test_integer_value_rejected() {
        let err = ChartReading::parse("index is 3, value is 12").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_index_overflow_is_parse_error() {
        let err = ChartReading::parse("index is 99999999999999999999999, value is 1.0").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_pair_missing_value_marker() {
        let err = parse_pair("index is 1, value is 1.0", "index is 2 value 1.0").unwrap_err();
        match err {
            Error::Parse { reason, .. } => assert!(reason.contains(", value is ")),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_pair_missing_index_marker() {
        let err = parse_pair("no data yet", "index is 2, value is 1.0").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_progress_ok() {
        let a = ChartReading { index: 10, value: 4.5 };
        let b = ChartReading { index: 12, value: 4.5 };
        check_progress(&a, &b).unwrap();
    }

    #[test]
    fn test_progress_frozen_index() {
        let a = ChartReading { index: 10, value: 4.5 };
        for index in [10, 9] {
            let b = ChartReading { index, value: 4.5 };
            assert!(matches!(check_progress(&a, &b), Err(Error::Assertion(_))));
        }
    }

    #[test]
    fn test_progress_value_changed() {
        let a = ChartReading { index: 10, value: 4.5 };
        let b = ChartReading { index: 11, value: 4.6 };
        assert!(matches!(check_progress(&a, &b), Err(Error::Assertion(_))));
    }
}
