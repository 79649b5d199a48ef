use crate::edit::{EditSyntax, FilePolicy};
use crate::locate::ResolveOptions;
use crate::render::RenderOptions;
use crate::config::errors::{ValidationError, ValidationIssue};
use serde::Deserialize;

/// Largest accepted `localization.context_window`.
pub const MAX_CONTEXT_WINDOW: usize = 10_000;

/// Engine settings, one TOML section per stage. Every field has a default.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub localization: LocalizationConfig,
    pub render: RenderOptions,
    pub skeleton: SkeletonConfig,
    pub repair: RepairConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.localization.context_window > MAX_CONTEXT_WINDOW {
            issues.push(ValidationIssue::OutOfRange {
                field: "localization.context_window",
                message: format!(
                    "{} exceeds the maximum of {MAX_CONTEXT_WINDOW}",
                    self.localization.context_window
                ),
            });
        }
        if self.render.max_total_chars == Some(0) {
            issues.push(ValidationIssue::OutOfRange {
                field: "render.max_total_chars",
                message: "budget must be positive".to_string(),
            });
        }
        if self.render.max_total_tokens == Some(0) {
            issues.push(ValidationIssue::OutOfRange {
                field: "render.max_total_tokens",
                message: "budget must be positive".to_string(),
            });
        }
        if self.render.pad_for_alignment && !self.render.show_line_numbers {
            issues.push(ValidationIssue::InvalidCombo {
                message: "render.pad_for_alignment requires render.show_line_numbers".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LocalizationConfig {
    pub context_window: usize,
    pub merge_intervals: bool,
    pub fine_grain_only: bool,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        let defaults = ResolveOptions::default();
        Self {
            context_window: defaults.context_window,
            merge_intervals: defaults.merge,
            fine_grain_only: defaults.fine_grain_only,
        }
    }
}

impl LocalizationConfig {
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            context_window: self.context_window,
            merge: self.merge_intervals,
            fine_grain_only: self.fine_grain_only,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SkeletonConfig {
    pub keep_globals: bool,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self { keep_globals: true }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    pub syntax: EditSyntax,
    pub file_policy: FilePolicy,
}
