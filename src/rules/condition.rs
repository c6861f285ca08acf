//! Condition grammar shared by rules and learned patterns.
//!
//! A `Condition` tests one attribute of a file. `Not` wraps another condition,
//! so the type is recursive and boxed.

use chrono::{DateTime, Duration, Utc};

use crate::models::FileView;
use crate::utils::format_size;

/// A single test against a file's metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Extension equals (case-insensitive, no leading dot): `pdf`
    ExtensionEquals(String),
    /// File name contains (case-insensitive)
    NameContains(String),
    /// File name starts with (case-insensitive)
    NameStartsWith(String),
    /// File name ends with (case-insensitive)
    NameEndsWith(String),
    /// Created more than `days` ago, optionally restricted to one extension
    OlderThan { days: u32, extension: Option<String> },
    /// Size strictly greater than the byte count
    SizeLargerThan(u64),
    /// Last modified more than `days` ago
    ModifiedOlderThan(u32),
    /// Last accessed more than `days` ago
    AccessedOlderThan(u32),
    /// Coarse kind equals (case-insensitive): `image`, `document`, ...
    KindEquals(String),
    /// Source location tag equals (case-insensitive): `downloads`, ...
    SourceLocationEquals(String),
    /// Logical negation of the inner condition
    Not(Box<Condition>),
}

impl Condition {
    /// Extension condition, normalizing case and a leading dot
    pub fn extension(ext: &str) -> Self {
        Condition::ExtensionEquals(normalize_extension(ext))
    }

    pub fn name_contains(text: &str) -> Self {
        Condition::NameContains(text.to_string())
    }

    pub fn name_starts_with(text: &str) -> Self {
        Condition::NameStartsWith(text.to_string())
    }

    pub fn name_ends_with(text: &str) -> Self {
        Condition::NameEndsWith(text.to_string())
    }

    pub fn older_than(days: u32, extension: Option<&str>) -> Self {
        Condition::OlderThan {
            days,
            extension: extension.map(normalize_extension),
        }
    }

    pub fn kind(kind: &str) -> Self {
        Condition::KindEquals(kind.to_string())
    }

    pub fn source_location(location: &str) -> Self {
        Condition::SourceLocationEquals(location.to_string())
    }

    /// Wrap a condition in `Not`
    pub fn negate(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }

    /// Evaluate against a file at the instant `now`.
    ///
    /// Pure: the same `(condition, file, now)` always yields the same result.
    pub fn evaluate<F: FileView + ?Sized>(&self, file: &F, now: DateTime<Utc>) -> bool {
        match self {
            Condition::ExtensionEquals(ext) => extension_matches(file, ext),
            Condition::NameContains(text) => {
                file.name().to_lowercase().contains(&text.to_lowercase())
            }
            Condition::NameStartsWith(text) => {
                file.name().to_lowercase().starts_with(&text.to_lowercase())
            }
            Condition::NameEndsWith(text) => {
                file.name().to_lowercase().ends_with(&text.to_lowercase())
            }
            Condition::OlderThan { days, extension } => {
                if let Some(ext) = extension {
                    if !extension_matches(file, ext) {
                        return false;
                    }
                }
                is_before_cutoff(file.created_at(), *days, now)
            }
            Condition::SizeLargerThan(bytes) => file.size() > *bytes,
            Condition::ModifiedOlderThan(days) => is_before_cutoff(file.modified_at(), *days, now),
            Condition::AccessedOlderThan(days) => is_before_cutoff(file.accessed_at(), *days, now),
            Condition::KindEquals(kind) => file.kind().eq_ignore_ascii_case(kind),
            Condition::SourceLocationEquals(location) => {
                file.source_location().eq_ignore_ascii_case(location)
            }
            Condition::Not(inner) => !inner.evaluate(file, now),
        }
    }

    /// Whether a match on this condition alone is a specific signal.
    ///
    /// Used to bucket match confidence.
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            Condition::ExtensionEquals(_)
                | Condition::KindEquals(_)
                | Condition::SourceLocationEquals(_)
                | Condition::NameStartsWith(_)
                | Condition::NameEndsWith(_)
        )
    }

    /// Case-folded copy used when comparing condition sets
    pub fn normalized(&self) -> Condition {
        match self {
            Condition::ExtensionEquals(ext) => Condition::ExtensionEquals(normalize_extension(ext)),
            Condition::NameContains(t) => Condition::NameContains(t.to_lowercase()),
            Condition::NameStartsWith(t) => Condition::NameStartsWith(t.to_lowercase()),
            Condition::NameEndsWith(t) => Condition::NameEndsWith(t.to_lowercase()),
            Condition::OlderThan { days, extension } => Condition::OlderThan {
                days: *days,
                extension: extension.as_deref().map(normalize_extension),
            },
            Condition::KindEquals(k) => Condition::KindEquals(k.to_lowercase()),
            Condition::SourceLocationEquals(l) => Condition::SourceLocationEquals(l.to_lowercase()),
            Condition::Not(inner) => Condition::Not(Box::new(inner.normalized())),
            other => other.clone(),
        }
    }

    /// Human readable description used in match reasons
    pub fn describe(&self) -> String {
        match self {
            Condition::ExtensionEquals(ext) => format!("extension is .{}", ext),
            Condition::NameContains(t) => format!("name contains \"{}\"", t),
            Condition::NameStartsWith(t) => format!("name starts with \"{}\"", t),
            Condition::NameEndsWith(t) => format!("name ends with \"{}\"", t),
            Condition::OlderThan { days, extension: None } => {
                format!("created more than {} days ago", days)
            }
            Condition::OlderThan {
                days,
                extension: Some(ext),
            } => format!(".{} created more than {} days ago", ext, days),
            Condition::SizeLargerThan(bytes) => format!("larger than {}", format_size(*bytes)),
            Condition::ModifiedOlderThan(days) => format!("not modified for {} days", days),
            Condition::AccessedOlderThan(days) => format!("not opened for {} days", days),
            Condition::KindEquals(k) => format!("kind is {}", k),
            Condition::SourceLocationEquals(l) => format!("found in {}", l),
            Condition::Not(inner) => format!("not ({})", inner.describe()),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn extension_matches<F: FileView + ?Sized>(file: &F, ext: &str) -> bool {
    file.extension()
        .map(|e| e.eq_ignore_ascii_case(ext.trim_start_matches('.')))
        .unwrap_or(false)
}

/// True when `timestamp` is strictly before `now - days`.
///
/// Missing timestamps never match, and neither does a cutoff beyond the
/// representable date range.
fn is_before_cutoff(timestamp: Option<DateTime<Utc>>, days: u32, now: DateTime<Utc>) -> bool {
    let Some(ts) = timestamp else {
        return false;
    };
    Duration::try_days(i64::from(days))
        .and_then(|age| now.checked_sub_signed(age))
        .map(|cutoff| ts < cutoff)
        .unwrap_or(false)
}
