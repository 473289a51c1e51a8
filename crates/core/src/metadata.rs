use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateSource {
    FileCreated,
    FileModified,
    ExifOriginal,
    FilenamePattern,
    VideoContainer,
}

impl DateSource {
    pub fn label(self) -> &'static str {
        match self {
            DateSource::FileCreated => "file-created",
            DateSource::FileModified => "file-modified",
            DateSource::ExifOriginal => "exif",
            DateSource::FilenamePattern => "filename",
            DateSource::VideoContainer => "video",
        }
    }
}

/// State of the `DateTimeOriginal` tag after resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TagStatus {
    /// The file already carried the tag.
    Present,
    /// The resolver wrote the tag into the file.
    Written,
    /// The tag would have been written, but write-back was disabled.
    Pending,
    /// Untagged JPEG with nothing trustworthy to write.
    Missing,
    /// Not a JPEG; tags are never written.
    NotApplicable,
}

impl TagStatus {
    pub fn label(self) -> &'static str {
        match self {
            TagStatus::Present => "present",
            TagStatus::Written => "written",
            TagStatus::Pending => "pending",
            TagStatus::Missing => "missing",
            TagStatus::NotApplicable => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateCandidate {
    pub source: DateSource,
    pub date: DateTime<Local>,
}

/// Outcome of date resolution for one file.
///
/// `date` is always the minimum of `candidates`, and `source` names the
/// candidate it came from. On ties the earlier-collected candidate wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub date: DateTime<Local>,
    pub source: DateSource,
    pub candidates: Vec<DateCandidate>,
    pub tag: TagStatus,
}

impl ResolvedDate {
    pub fn from_candidates(candidates: Vec<DateCandidate>) -> Option<Self> {
        let winner = earliest(&candidates)?;
        Some(Self {
            date: winner.date,
            source: winner.source,
            candidates,
            tag: TagStatus::NotApplicable,
        })
    }

    pub fn candidate(&self, source: DateSource) -> Option<&DateCandidate> {
        self.candidates.iter().find(|c| c.source == source)
    }
}

pub fn earliest(candidates: &[DateCandidate]) -> Option<DateCandidate> {
    candidates
        .iter()
        .copied()
        .reduce(|best, next| if next.date < best.date { next } else { best })
}

#[cfg(test)]
mod tests {
    use super::{earliest, DateCandidate, DateSource, ResolvedDate, TagStatus};
    use chrono::{Local, TimeZone};

    fn at(h: u32) -> DateCandidate {
        DateCandidate {
            source: DateSource::FileModified,
            date: Local
                .with_ymd_and_hms(2023, 3, 12, h, 0, 0)
                .single()
                .expect("valid local time"),
        }
    }

    #[test]
    fn resolved_date_picks_minimum_and_its_source() {
        let mut exif = at(9);
        exif.source = DateSource::ExifOriginal;
        let resolved =
            ResolvedDate::from_candidates(vec![at(12), exif, at(10)]).expect("non-empty");

        assert_eq!(resolved.date, exif.date);
        assert_eq!(resolved.source, DateSource::ExifOriginal);
        assert_eq!(resolved.candidates.len(), 3);
        assert_eq!(resolved.tag, TagStatus::NotApplicable);
    }

    #[test]
    fn earliest_keeps_first_candidate_on_tie() {
        let created = DateCandidate {
            source: DateSource::FileCreated,
            ..at(8)
        };
        let modified = at(8);

        let winner = earliest(&[created, modified]).expect("non-empty");
        assert_eq!(winner.source, DateSource::FileCreated);
    }

    #[test]
    fn from_candidates_returns_none_when_empty() {
        assert!(ResolvedDate::from_candidates(Vec::new()).is_none());
    }
}
