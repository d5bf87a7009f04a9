use crate::date_resolver::{resolve_date, DateResolution, DateSource, SkipReason};
use crate::exif_reader::{ExifTagTable, REQUIRED_EXIF_TAGS};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_MAX_SEQUENCE: usize = 99;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub input: PathBuf,
    pub max_sequence: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            max_sequence: DEFAULT_MAX_SEQUENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub date: NaiveDate,
    pub date_source: DateSource,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub media_files: usize,
    pub skipped_non_media: usize,
    pub skipped_unreadable: usize,
    pub skipped_no_date: usize,
    pub skipped_sequence_exhausted: usize,
    pub planned: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub root: PathBuf,
    pub max_sequence: usize,
    pub candidates: Vec<RenameCandidate>,
    pub skipped: Vec<SkippedFile>,
    pub stats: RenameStats,
}

pub fn generate_plan(options: &PlanOptions) -> Result<RenamePlan> {
    if !options.input.exists() {
        anyhow::bail!("入力フォルダが存在しません: {}", options.input.display());
    }
    if !options.input.is_dir() {
        anyhow::bail!("入力パスがフォルダではありません: {}", options.input.display());
    }

    let table = ExifTagTable::resolve(REQUIRED_EXIF_TAGS)?;

    let mut stats = RenameStats::default();
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    let mut planned_paths = HashSet::<PathBuf>::new();

    for entry in WalkDir::new(&options.input).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("フォルダ走査に失敗しました: {}", options.input.display()))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        stats.scanned_files += 1;

        match resolve_date(path, &table) {
            DateResolution::Resolved { date, source } => {
                stats.media_files += 1;
                match resolve_sequence(path, date, options.max_sequence, &mut planned_paths)? {
                    Some(target) => {
                        let changed = target != path;
                        if !changed {
                            stats.unchanged += 1;
                        }
                        stats.planned += 1;
                        candidates.push(RenameCandidate {
                            original_path: path.to_path_buf(),
                            target_path: target,
                            date,
                            date_source: source,
                            changed,
                        });
                    }
                    None => {
                        log::warn!(
                            "連番が上限{}に達したためスキップします: {}",
                            options.max_sequence,
                            path.display()
                        );
                        stats.skipped_sequence_exhausted += 1;
                        skipped.push(SkippedFile {
                            path: path.to_path_buf(),
                            reason: SkipReason::SequenceExhausted,
                        });
                    }
                }
            }
            DateResolution::Skipped(reason) => {
                match reason {
                    SkipReason::NotMedia => {
                        log::info!("画像/動画ではありません: {}", path.display());
                        stats.skipped_non_media += 1;
                    }
                    // Unreadable or undatable files are still media by
                    // extension and count as such.
                    SkipReason::UnreadableImage => {
                        stats.media_files += 1;
                        stats.skipped_unreadable += 1;
                    }
                    SkipReason::NoUsableDate => {
                        log::warn!("日付を特定できませんでした: {}", path.display());
                        stats.media_files += 1;
                        stats.skipped_no_date += 1;
                    }
                    SkipReason::SequenceExhausted => {}
                }
                skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        }
    }

    Ok(RenamePlan {
        root: options.input.clone(),
        max_sequence: options.max_sequence,
        candidates,
        skipped,
        stats,
    })
}

fn resolve_sequence(
    original_path: &Path,
    date: NaiveDate,
    max_sequence: usize,
    planned_paths: &mut HashSet<PathBuf>,
) -> Result<Option<PathBuf>> {
    let parent = original_path
        .parent()
        .context("親ディレクトリを取得できませんでした")?;
    let extension = original_path
        .extension()
        .map(|value| format!(".{}", value.to_string_lossy()))
        .unwrap_or_default();
    let date_label = date.format("%Y.%m.%d").to_string();

    for n in 1..=max_sequence {
        let candidate = parent.join(format!("{} ({}){}", date_label, n, extension));
        if is_available(&candidate, original_path, planned_paths) {
            planned_paths.insert(candidate.clone());
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

fn is_available(candidate: &Path, original_path: &Path, planned_paths: &HashSet<PathBuf>) -> bool {
    if planned_paths.contains(candidate) {
        return false;
    }
    if candidate == original_path {
        return true;
    }
    !candidate.exists()
}
