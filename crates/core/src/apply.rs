use crate::planner::{RenameCandidate, RenamePlan};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub unchanged: usize,
    pub failures: Vec<ApplyFailure>,
}

pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult> {
    let candidates: Vec<&RenameCandidate> = plan.candidates.iter().filter(|c| c.changed).collect();
    let unchanged = plan.candidates.len() - candidates.len();
    if candidates.is_empty() {
        return Ok(ApplyResult {
            applied: 0,
            unchanged,
            failures: Vec::new(),
        });
    }

    validate_apply_candidates(&candidates)?;

    let mut applied = 0usize;
    let mut failures = Vec::new();
    for candidate in candidates {
        if candidate.target_path.exists() {
            log::warn!(
                "リネーム先が既に存在するためスキップします: {}",
                candidate.target_path.display()
            );
            failures.push(ApplyFailure {
                original_path: candidate.original_path.clone(),
                target_path: candidate.target_path.clone(),
                message: "リネーム先が既に存在します".to_string(),
            });
            continue;
        }

        match fs::rename(&candidate.original_path, &candidate.target_path) {
            Ok(()) => {
                log::debug!(
                    "リネームしました: {} -> {}",
                    candidate.original_path.display(),
                    candidate.target_path.display()
                );
                applied += 1;
            }
            Err(err) => {
                log::warn!(
                    "リネームに失敗しました: {} -> {}: {err}",
                    candidate.original_path.display(),
                    candidate.target_path.display()
                );
                failures.push(ApplyFailure {
                    original_path: candidate.original_path.clone(),
                    target_path: candidate.target_path.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(ApplyResult {
        applied,
        unchanged,
        failures,
    })
}

fn validate_apply_candidates(candidates: &[&RenameCandidate]) -> Result<()> {
    let mut seen_target_paths = HashSet::<&Path>::new();

    for candidate in candidates {
        let original_parent = candidate.original_path.parent().with_context(|| {
            format!(
                "元ファイルに親ディレクトリがありません: {}",
                candidate.original_path.display()
            )
        })?;
        let target_parent = candidate.target_path.parent().with_context(|| {
            format!(
                "リネーム先に親ディレクトリがありません: {}",
                candidate.target_path.display()
            )
        })?;
        if original_parent != target_parent {
            bail!(
                "元ファイルと異なるフォルダへのリネームは適用できません: {}",
                candidate.target_path.display()
            );
        }
        if !seen_target_paths.insert(candidate.target_path.as_path()) {
            bail!(
                "重複したリネーム先が含まれています: {}",
                candidate.target_path.display()
            );
        }
    }

    Ok(())
}
