//! Response validation: pure functions over a stage's selection rules.
//!
//! No session access, no side effects. The engine builds `SelectionRules`
//! from the stage definition (or the live dynamic choice list) and calls
//! `validate` before touching any session state, so a rejected submission
//! can never leave a half-applied mutation behind.

use serde::Serialize;
use thiserror::Error;

use crate::exploration::catalog::{ChoiceList, StageDefinition};

/// Why a submission was rejected. Rules apply in declaration order and the
/// first failure wins.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("no choices were selected")]
    EmptySelection,

    #[error("choice {index} is out of range (valid: 1..={max})")]
    OutOfRangeIndex { index: usize, max: usize },

    #[error("{got} choices selected, but this question allows {min}..={max}")]
    CountOutOfBounds { got: usize, min: usize, max: usize },

    #[error("the 'other' choice cannot be combined with other selections")]
    OtherNotSole,

    #[error("selecting 'other' requires a written answer")]
    MissingFreeText,
}

/// The constraints one submission is checked against.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRules {
    /// Number of live options (static or dynamically generated).
    pub choice_count: usize,
    pub selection_min: usize,
    pub selection_max: usize,
    /// 1-based "other" slot, if the live list has one.
    pub other_index: Option<usize>,
}

impl SelectionRules {
    /// Rules for a stage answered against its live choice list. Selection
    /// bounds always come from the definition; range and the "other" slot
    /// come from whichever list the student actually saw.
    pub fn for_stage(definition: &StageDefinition, live: &ChoiceList) -> Self {
        SelectionRules {
            choice_count: live.options.len(),
            selection_min: definition.selection_min,
            selection_max: definition.selection_max,
            other_index: live.other_index,
        }
    }
}

/// Validates selected indices (1-based) and optional free text against the
/// rules. Ok means the submission may be recorded verbatim.
pub fn validate(
    rules: &SelectionRules,
    indices: &[usize],
    free_text: Option<&str>,
) -> Result<(), ValidationError> {
    if indices.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    for &index in indices {
        if index < 1 || index > rules.choice_count {
            return Err(ValidationError::OutOfRangeIndex {
                index,
                max: rules.choice_count,
            });
        }
    }

    let count = indices.len();
    if count < rules.selection_min || count > rules.selection_max {
        return Err(ValidationError::CountOutOfBounds {
            got: count,
            min: rules.selection_min,
            max: rules.selection_max,
        });
    }

    if let Some(other) = rules.other_index {
        if indices.contains(&other) {
            if count > 1 {
                return Err(ValidationError::OtherNotSole);
            }
            let has_text = free_text.map(|t| !t.trim().is_empty()).unwrap_or(false);
            if !has_text {
                return Err(ValidationError::MissingFreeText);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The canonical "pick 1-2 out of 11, index 11 means other" shape.
    fn rules() -> SelectionRules {
        SelectionRules {
            choice_count: 11,
            selection_min: 1,
            selection_max: 2,
            other_index: Some(11),
        }
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert_eq!(
            validate(&rules(), &[], None),
            Err(ValidationError::EmptySelection)
        );
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        assert_eq!(
            validate(&rules(), &[12], None),
            Err(ValidationError::OutOfRangeIndex { index: 12, max: 11 })
        );
        assert_eq!(
            validate(&rules(), &[0], None),
            Err(ValidationError::OutOfRangeIndex { index: 0, max: 11 })
        );
    }

    #[test]
    fn test_count_above_max_rejected() {
        assert_eq!(
            validate(&rules(), &[1, 2, 3], None),
            Err(ValidationError::CountOutOfBounds {
                got: 3,
                min: 1,
                max: 2
            })
        );
    }

    #[test]
    fn test_single_select_stage_rejects_two() {
        let single = SelectionRules {
            choice_count: 10,
            selection_min: 1,
            selection_max: 1,
            other_index: Some(10),
        };
        assert_eq!(
            validate(&single, &[2, 3], None),
            Err(ValidationError::CountOutOfBounds {
                got: 2,
                min: 1,
                max: 1
            })
        );
    }

    #[test]
    fn test_other_with_empty_free_text_rejected() {
        assert_eq!(
            validate(&rules(), &[11], None),
            Err(ValidationError::MissingFreeText)
        );
        assert_eq!(
            validate(&rules(), &[11], Some("   ")),
            Err(ValidationError::MissingFreeText)
        );
    }

    #[test]
    fn test_other_co_selected_rejected() {
        assert_eq!(
            validate(&rules(), &[11, 2], Some("astronaut chef")),
            Err(ValidationError::OtherNotSole)
        );
    }

    #[test]
    fn test_other_alone_with_text_accepted() {
        assert_eq!(validate(&rules(), &[11], Some("astronaut chef")), Ok(()));
    }

    #[test]
    fn test_regular_selections_accepted() {
        assert_eq!(validate(&rules(), &[1], None), Ok(()));
        assert_eq!(validate(&rules(), &[1, 5], None), Ok(()));
    }

    #[test]
    fn test_range_check_runs_before_count_check() {
        // First failure wins: [1, 2, 99] fails on range, not count.
        assert_eq!(
            validate(&rules(), &[1, 2, 99], None),
            Err(ValidationError::OutOfRangeIndex { index: 99, max: 11 })
        );
    }

    #[test]
    fn test_dynamic_list_without_other_ignores_free_text_rule() {
        let dynamic = SelectionRules {
            choice_count: 5,
            selection_min: 1,
            selection_max: 1,
            other_index: None,
        };
        assert_eq!(validate(&dynamic, &[5], None), Ok(()));
    }
}
