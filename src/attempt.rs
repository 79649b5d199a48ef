//! One repair attempt per model sample: Parsed -> Applied -> Validated -> verdict.
//!
//! Attempts never share mutable state. Every sample is parsed, applied, and
//! validated against the same original contents, so samples run in parallel.

use crate::edit::{parse_edits, EditPlan, EditSyntax, FilePolicy};
use crate::index::normalize_path;
use crate::validate::{apply_and_validate, FailedOperation, PatchResult};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoEditOperations,
    FileNotInContext,
    SyntaxInvalid,
    NotMeaningful,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::NoEditOperations => "no edit operations parsed",
            RejectReason::FileNotInContext => "edited file is not in the context",
            RejectReason::SyntaxInvalid => "patched file does not parse",
            RejectReason::NotMeaningful => "patch only changes blank lines",
        };
        f.write_str(text)
    }
}

/// What is persisted for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub sample_index: usize,
    pub status: AttemptStatus,
    pub reject_reason: Option<RejectReason>,
    pub edited_file: Option<String>,
    /// The diff, only when the attempt was accepted.
    pub model_patch: String,
    /// The diff regardless of the verdict.
    pub raw_model_patch: String,
    pub raw_output: String,
    pub post_processed: String,
    pub failed_operations: Vec<FailedOperation>,
    /// Patched contents by path.
    #[serde(skip)]
    pub new_contents: Vec<(String, String)>,
}

impl AttemptRecord {
    pub fn is_accepted(&self) -> bool {
        self.status == AttemptStatus::Accepted
    }

    fn rejected(sample_index: usize, reason: RejectReason, raw_output: &str, plan: &EditPlan) -> Self {
        Self {
            sample_index,
            status: AttemptStatus::Rejected,
            reject_reason: Some(reason),
            edited_file: plan.files.keys().next().cloned(),
            model_patch: String::new(),
            raw_model_patch: String::new(),
            raw_output: raw_output.to_string(),
            post_processed: plan.post_processed(),
            failed_operations: Vec::new(),
            new_contents: Vec::new(),
        }
    }
}

/// The fixed inputs of a repair round: the files shown to the model and the
/// edit grammar it was asked to use.
#[derive(Debug, Clone)]
pub struct RepairSession {
    file_contents: HashMap<String, String>,
    syntax: EditSyntax,
    policy: FilePolicy,
}

impl RepairSession {
    pub fn new(file_contents: HashMap<String, String>, syntax: EditSyntax) -> Self {
        let file_contents = file_contents
            .into_iter()
            .map(|(path, text)| (normalize_path(&path), text))
            .collect();
        Self {
            file_contents,
            syntax,
            policy: FilePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(&self, model_text: &str) -> AttemptRecord {
        self.run_sample(0, model_text)
    }

    /// Run every sample; records come back in sample order.
    pub fn run_samples<S>(&self, samples: &[S]) -> Vec<AttemptRecord>
    where
        S: AsRef<str> + Sync,
    {
        samples
            .par_iter()
            .enumerate()
            .map(|(idx, sample)| self.run_sample(idx, sample.as_ref()))
            .collect()
    }

    pub fn run_sample(&self, sample_index: usize, model_text: &str) -> AttemptRecord {
        let plan = parse_edits(model_text, self.syntax, self.policy);
        debug!(
            sample = sample_index,
            files = plan.files.len(),
            operations = plan.operation_count(),
            skipped = plan.skipped,
            "parsed edit commands"
        );
        let record = self.judge(sample_index, model_text, &plan);
        info!(
            sample = sample_index,
            status = ?record.status,
            reason = ?record.reject_reason,
            file = ?record.edited_file,
            "repair attempt finished"
        );
        record
    }

    fn judge(&self, sample_index: usize, model_text: &str, plan: &EditPlan) -> AttemptRecord {
        if plan.is_empty() {
            return AttemptRecord::rejected(
                sample_index,
                RejectReason::NoEditOperations,
                model_text,
                plan,
            );
        }

        let mut patches: Vec<PatchResult> = Vec::with_capacity(plan.files.len());
        for (path, operations) in &plan.files {
            let Some(original) = self.file_contents.get(path) else {
                return AttemptRecord::rejected(
                    sample_index,
                    RejectReason::FileNotInContext,
                    model_text,
                    plan,
                );
            };
            patches.push(apply_and_validate(path, original, operations));
        }

        let raw_model_patch: String = patches.iter().map(|p| p.unified_diff.as_str()).collect();
        let reason = if patches.iter().any(|p| !p.syntax_valid) {
            Some(RejectReason::SyntaxInvalid)
        } else if !patches.iter().any(|p| p.is_meaningful) {
            Some(RejectReason::NotMeaningful)
        } else {
            None
        };

        let failed_operations = patches
            .iter()
            .flat_map(|p| p.failed_operations.iter().cloned())
            .collect();
        let new_contents = patches
            .iter()
            .filter(|p| p.new_content != p.original_content)
            .filter_map(|p| Some((p.edited_file.clone()?, p.new_content.clone())))
            .collect();

        AttemptRecord {
            sample_index,
            status: if reason.is_none() {
                AttemptStatus::Accepted
            } else {
                AttemptStatus::Rejected
            },
            reject_reason: reason,
            edited_file: plan.files.keys().next().cloned(),
            model_patch: if reason.is_none() {
                raw_model_patch.clone()
            } else {
                String::new()
            },
            raw_model_patch,
            raw_output: model_text.to_string(),
            post_processed: plan.post_processed(),
            failed_operations,
            new_contents,
        }
    }
}
