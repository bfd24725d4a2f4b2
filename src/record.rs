//! Records produced by `sadf`, and their translation into [`Metric`]s.

use std::ops::Deref;

/// Index of the device/instance qualifier, e.g. `eth0`, `cpu1`, `-`, `all`.
const QUALIFIER_FIELD: usize = 3;
/// Index of the raw metric key, e.g. `kbmemfree`, `rxkB/s`, `%usr`.
const KEY_FIELD: usize = 4;
/// Index of the numeric value.
const VALUE_FIELD: usize = 5;

/// One tab-delimited line of `sadf` output.
///
/// A typical line looks like
/// `host\t1\t2024-01-01 00:00:01 UTC\teth0\trxkB/s\t12.50`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Split a line on the tab character.
    pub fn from_line(line: &str) -> Self {
        Self {
            fields: line.split('\t').map(str::to_owned).collect(),
        }
    }

    /// The field at `index`, if the record is wide enough.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

impl Deref for Record {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A gauge ready to be shipped: a dotted name and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Metric name, without the statsd prefix. Never contains `%`.
    pub name: String,

    /// Gauge value, converted to bytes or bits where the key was in kilobytes.
    pub value: f64,
}

/// Translate a record into a metric.
///
/// Returns `None` when the value field is missing or not a number. `sadf`
/// emits header and comment rows, so this is expected and not an error.
///
/// Naming rules, in order:
/// - a `kb` prefix is dropped and the value scaled to bytes
///   (`kbmemfree` -> `memfree`);
/// - otherwise `kB` at byte offset 2 is rewritten to `bit` and the value
///   scaled to bits (`rxkB/s` -> `rxbit/s`);
/// - a qualifier other than `-` or `all` is prepended with a dot
///   (`eth0.rxbit/s`);
/// - every `%` becomes `pct_` (`%usr` -> `pct_usr`).
pub fn translate(record: &Record) -> Option<Metric> {
    let mut value: f64 = record.field(VALUE_FIELD)?.parse().ok()?;
    let key = record.field(KEY_FIELD)?;

    let mut name = if let Some(rest) = key.strip_prefix("kb") {
        value *= 1024.0;
        rest.to_owned()
    } else if key.len() > 3 && &key.as_bytes()[2..4] == b"kB" {
        // Both bytes are ASCII, so offsets 2 and 4 are char boundaries.
        value *= 1024.0 * 8.0;
        format!("{}bit{}", &key[..2], &key[4..])
    } else {
        key.to_owned()
    };

    if let Some(qualifier) = record.field(QUALIFIER_FIELD)
        && qualifier != "-"
        && qualifier != "all"
    {
        name = format!("{qualifier}.{name}");
    }

    Some(Metric {
        name: name.replace('%', "pct_"),
        value,
    })
}
