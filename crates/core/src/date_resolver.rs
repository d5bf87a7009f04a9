use crate::exif_reader::{read_metadata, ExifTagTable, UnreadableImage};
use crate::media::{media_kind, MediaKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSource {
    FileName,
    Exif,
    FileModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NotMedia,
    UnreadableImage,
    NoUsableDate,
    SequenceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateResolution {
    Resolved { date: NaiveDate, source: DateSource },
    Skipped(SkipReason),
}

#[derive(Debug, Error)]
#[error("ファイル名の8桁数字を日付として解釈できませんでした: {digits}")]
pub struct UnparsableNameDate {
    pub digits: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateStrategy {
    EmbeddedName,
    ExifOriginal,
    FileModified,
}

const IMAGE_STRATEGIES: &[DateStrategy] = &[
    DateStrategy::EmbeddedName,
    DateStrategy::ExifOriginal,
    DateStrategy::FileModified,
];

const VIDEO_STRATEGIES: &[DateStrategy] =
    &[DateStrategy::EmbeddedName, DateStrategy::FileModified];

pub fn resolve_date(path: &Path, table: &ExifTagTable) -> DateResolution {
    let strategies = match media_kind(path) {
        Some(MediaKind::Image) => IMAGE_STRATEGIES,
        Some(MediaKind::Video) => VIDEO_STRATEGIES,
        None => return DateResolution::Skipped(SkipReason::NotMedia),
    };

    for strategy in strategies {
        match strategy {
            DateStrategy::EmbeddedName => match date_from_name(path) {
                Ok(Some(date)) => {
                    return DateResolution::Resolved {
                        date,
                        source: DateSource::FileName,
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{}: {err}", path.display());
                }
            },
            DateStrategy::ExifOriginal => match date_from_exif(path, table) {
                Ok(Some(date)) => {
                    return DateResolution::Resolved {
                        date,
                        source: DateSource::Exif,
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{err}");
                    return DateResolution::Skipped(SkipReason::UnreadableImage);
                }
            },
            DateStrategy::FileModified => {
                if let Some(date) = file_modified_date(path) {
                    return DateResolution::Resolved {
                        date,
                        source: DateSource::FileModified,
                    };
                }
            }
        }
    }

    DateResolution::Skipped(SkipReason::NoUsableDate)
}

pub fn date_from_name(path: &Path) -> Result<Option<NaiveDate>, UnparsableNameDate> {
    let name = path
        .file_name()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();

    let Some(run) = first_eight_digit_run(&name) else {
        return Ok(None);
    };

    match NaiveDate::parse_from_str(run, "%Y%m%d") {
        Ok(date) => Ok(Some(date)),
        Err(_) => Err(UnparsableNameDate {
            digits: run.to_string(),
        }),
    }
}

fn first_eight_digit_run(name: &str) -> Option<&str> {
    name.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 8)
}

fn date_from_exif(path: &Path, table: &ExifTagTable) -> Result<Option<NaiveDate>, UnreadableImage> {
    let record = read_metadata(path, table)?;
    Ok(record.get("DateTimeOriginal").and_then(parse_exif_datetime))
}

fn parse_exif_datetime(raw: &str) -> Option<NaiveDate> {
    let normalized = raw.trim();
    let candidates = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    for fmt in candidates {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(normalized, fmt) {
            return Some(datetime.date());
        }
    }

    None
}

fn file_modified_date(path: &Path) -> Option<NaiveDate> {
    let time = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(time).date_naive())
}

#[cfg(test)]
mod tests {
    use super::{date_from_name, parse_exif_datetime, resolve_date, DateResolution, DateSource, SkipReason};
    use crate::exif_reader::{ExifTagTable, REQUIRED_EXIF_TAGS};
    use chrono::{Local, NaiveDate, TimeZone};
    use filetime::FileTime;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const JPEG_WITHOUT_EXIF: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

    fn table() -> ExifTagTable {
        ExifTagTable::resolve(REQUIRED_EXIF_TAGS).expect("tag table")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
        let local = Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("local noon");
        filetime::set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0))
            .expect("set mtime");
    }

    #[test]
    fn first_eight_digit_run_wins_over_other_runs() {
        let resolved = date_from_name(Path::new("IMG_20230401_101.jpg"))
            .expect("valid run")
            .expect("date present");
        assert_eq!(resolved, date(2023, 4, 1));
    }

    #[test]
    fn shorter_and_longer_runs_are_ignored() {
        assert_eq!(
            date_from_name(Path::new("IMG_1234567_123456789.jpg")).expect("no valid run"),
            None
        );
    }

    #[test]
    fn later_eight_digit_run_is_found_after_short_runs() {
        let resolved = date_from_name(Path::new("cam2_shot_20221225.jpg"))
            .expect("valid run")
            .expect("date present");
        assert_eq!(resolved, date(2022, 12, 25));
    }

    #[test]
    fn invalid_calendar_run_is_the_unparsable_condition() {
        let err = date_from_name(Path::new("serial_99999999.jpg")).expect_err("month 99");
        assert_eq!(err.digits, "99999999");
    }

    #[test]
    fn generated_names_contain_no_eight_digit_run() {
        // "2023.04.01 (1).jpg" splits into runs 2023 / 04 / 01 / 1, so a
        // second pass never re-reads the date from the name.
        assert_eq!(
            date_from_name(Path::new("2023.04.01 (1).jpg")).expect("no run"),
            None
        );
    }

    #[test]
    fn exif_datetime_parses_the_colon_form() {
        assert_eq!(
            parse_exif_datetime("2021:07:15 09:30:00"),
            Some(date(2021, 7, 15))
        );
        assert_eq!(
            parse_exif_datetime("2021-07-15 09:30:00"),
            Some(date(2021, 7, 15))
        );
        assert_eq!(parse_exif_datetime("not a datetime"), None);
    }

    #[test]
    fn name_tier_beats_modification_time() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("IMG_20230401_101.jpg");
        fs::write(&path, JPEG_WITHOUT_EXIF).expect("write fixture");
        set_mtime(&path, 2020, 1, 1);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Resolved {
                date: date(2023, 4, 1),
                source: DateSource::FileName,
            }
        );
    }

    #[test]
    fn exif_tier_supplies_the_date_when_the_name_has_none() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        fs::write(
            &path,
            crate::exif_reader::jpeg_with_datetime_original("2021:07:15 09:30:00"),
        )
        .expect("write fixture");
        set_mtime(&path, 2020, 1, 1);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Resolved {
                date: date(2021, 7, 15),
                source: DateSource::Exif,
            }
        );
    }

    #[test]
    fn image_without_name_or_exif_date_uses_modification_time() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("photo.jpg");
        fs::write(&path, JPEG_WITHOUT_EXIF).expect("write fixture");
        set_mtime(&path, 2023, 4, 1);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Resolved {
                date: date(2023, 4, 1),
                source: DateSource::FileModified,
            }
        );
    }

    #[test]
    fn unreadable_image_is_skipped_without_reaching_the_mtime_tier() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.jpg");
        fs::write(&path, b"not an image at all").expect("write fixture");
        set_mtime(&path, 2023, 4, 1);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Skipped(SkipReason::UnreadableImage)
        );
    }

    #[test]
    fn video_never_consults_the_exif_accessor() {
        // Garbage bytes would be UnreadableImage if the EXIF tier ran.
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mp4");
        fs::write(&path, b"not an image at all").expect("write fixture");
        set_mtime(&path, 2022, 12, 25);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Resolved {
                date: date(2022, 12, 25),
                source: DateSource::FileModified,
            }
        );
    }

    #[test]
    fn unparsable_name_run_falls_through_to_the_next_tier() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("serial_99999999.mp4");
        fs::write(&path, b"video").expect("write fixture");
        set_mtime(&path, 2022, 12, 25);

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Resolved {
                date: date(2022, 12, 25),
                source: DateSource::FileModified,
            }
        );
    }

    #[test]
    fn unrecognized_extension_is_not_media() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, b"text").expect("write fixture");

        assert_eq!(
            resolve_date(&path, &table()),
            DateResolution::Skipped(SkipReason::NotMedia)
        );
    }
}
