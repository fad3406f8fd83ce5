/// Decomposition rules: a college's requirement profile expands into
/// canonical tasks with default estimated hours and reuse semantics.
use crate::domain::{CanonicalTaskKind, DependencyType, RequirementProfile, TaskType};

/// Recommendation requests should land at least this many days before the
/// final submission (advisory; surfaces as risk, not a block).
pub const RECOMMENDATION_LEAD_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reusability {
    /// Shared across colleges using the same platform.
    Full,
    /// Content carries over but the submission stays per-college.
    Partial,
    No,
}

#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub title: String,
    pub task_type: TaskType,
    pub canonical_kind: CanonicalTaskKind,
    /// Ordinal for repeated kinds (essay #k, recommendation #k); 0 otherwise.
    pub ordinal: u8,
    pub estimated_hours: f64,
    /// Priority 1 (highest) to 4.
    pub priority: u8,
    pub reusability: Reusability,
}

impl TaskTemplate {
    pub fn is_reusable(&self) -> bool {
        !matches!(self.reusability, Reusability::No)
    }
}

/// Dependency among templates, referencing positions in the emitted vector.
pub type TemplateDependency = (usize, usize, DependencyType, Option<i64>);

/// Expand a requirement profile into its canonical task list. The final
/// submission task is always last.
pub fn decompose(requirements: &RequirementProfile, international: bool) -> Vec<TaskTemplate> {
    let mut templates = Vec::new();

    templates.push(TaskTemplate {
        title: "Complete main application form".to_string(),
        task_type: TaskType::Form,
        canonical_kind: CanonicalTaskKind::MainForm,
        ordinal: 0,
        estimated_hours: 3.0,
        priority: 2,
        reusability: Reusability::No,
    });

    if requirements.common_app_essay_required {
        templates.push(TaskTemplate {
            title: "Main essay".to_string(),
            task_type: TaskType::Essay,
            canonical_kind: CanonicalTaskKind::MainEssay,
            ordinal: 0,
            estimated_hours: 15.0,
            priority: 1,
            reusability: Reusability::Full,
        });
    }

    for k in 1..=requirements.supplemental_essays_count {
        templates.push(TaskTemplate {
            title: format!("Supplemental essay #{}", k),
            task_type: TaskType::Essay,
            canonical_kind: CanonicalTaskKind::SupplementalEssay,
            ordinal: k,
            estimated_hours: 5.0,
            priority: 2,
            reusability: Reusability::Partial,
        });
    }

    for k in 1..=requirements.teacher_recommendations_required {
        templates.push(TaskTemplate {
            title: format!("Request teacher recommendation #{}", k),
            task_type: TaskType::Recommendation,
            canonical_kind: CanonicalTaskKind::TeacherRecommendation,
            ordinal: k,
            estimated_hours: 1.0,
            priority: 2,
            reusability: Reusability::Full,
        });
    }

    if requirements.counselor_recommendation_required {
        templates.push(TaskTemplate {
            title: "Request counselor recommendation".to_string(),
            task_type: TaskType::Recommendation,
            canonical_kind: CanonicalTaskKind::CounselorRecommendation,
            ordinal: 0,
            estimated_hours: 1.0,
            priority: 2,
            reusability: Reusability::Full,
        });
    }

    if requirements.peer_recommendation_required {
        templates.push(TaskTemplate {
            title: "Request peer recommendation".to_string(),
            task_type: TaskType::Recommendation,
            canonical_kind: CanonicalTaskKind::PeerRecommendation,
            ordinal: 0,
            estimated_hours: 1.0,
            priority: 3,
            reusability: Reusability::No,
        });
    }

    if requirements.test_policy != crate::domain::TestPolicy::TestBlind {
        templates.push(TaskTemplate {
            title: "Submit test scores".to_string(),
            task_type: TaskType::Test,
            canonical_kind: CanonicalTaskKind::TestScores,
            ordinal: 0,
            estimated_hours: 1.0,
            priority: 3,
            reusability: Reusability::Full,
        });
    }

    if requirements.requires_english_proficiency() && international {
        templates.push(TaskTemplate {
            title: "Submit English proficiency".to_string(),
            task_type: TaskType::Test,
            canonical_kind: CanonicalTaskKind::EnglishProficiency,
            ordinal: 0,
            estimated_hours: 1.0,
            priority: 3,
            reusability: Reusability::Full,
        });
    }

    if requirements.interview_required {
        templates.push(TaskTemplate {
            title: "Complete interview".to_string(),
            task_type: TaskType::Interview,
            canonical_kind: CanonicalTaskKind::Interview,
            ordinal: 0,
            estimated_hours: 2.0,
            priority: 3,
            reusability: Reusability::No,
        });
    }

    if requirements.portfolio_required {
        templates.push(TaskTemplate {
            title: "Submit portfolio".to_string(),
            task_type: TaskType::Portfolio,
            canonical_kind: CanonicalTaskKind::Portfolio,
            ordinal: 0,
            estimated_hours: 20.0,
            priority: 1,
            reusability: Reusability::Partial,
        });
    }

    if requirements.audition_required {
        templates.push(TaskTemplate {
            title: "Complete audition".to_string(),
            task_type: TaskType::Other,
            canonical_kind: CanonicalTaskKind::Portfolio,
            ordinal: 1,
            estimated_hours: 10.0,
            priority: 1,
            reusability: Reusability::No,
        });
    }

    templates.push(TaskTemplate {
        title: "Submit final application".to_string(),
        task_type: TaskType::Form,
        canonical_kind: CanonicalTaskKind::FinalSubmit,
        ordinal: 0,
        estimated_hours: 1.0,
        priority: 1,
        reusability: Reusability::No,
    });

    templates
}

/// Wire the canonical dependency edges over a decomposed template list:
/// - final submit hard-blocks on every other task,
/// - supplemental essays soft-depend on the main essay,
/// - recommendation requests should complete ≥ 14 days before final submit.
pub fn dependencies(templates: &[TaskTemplate]) -> Vec<TemplateDependency> {
    let mut edges = Vec::new();

    let final_idx = templates
        .iter()
        .position(|t| t.canonical_kind == CanonicalTaskKind::FinalSubmit);
    let main_essay_idx = templates
        .iter()
        .position(|t| t.canonical_kind == CanonicalTaskKind::MainEssay);

    let Some(final_idx) = final_idx else {
        return edges;
    };

    for (idx, template) in templates.iter().enumerate() {
        if idx == final_idx {
            continue;
        }
        edges.push((final_idx, idx, DependencyType::Blocks, None));

        if template.task_type == TaskType::Recommendation {
            edges.push((
                final_idx,
                idx,
                DependencyType::ShouldCompleteFirst,
                Some(RECOMMENDATION_LEAD_DAYS),
            ));
        }

        if template.canonical_kind == CanonicalTaskKind::SupplementalEssay {
            if let Some(essay_idx) = main_essay_idx {
                edges.push((idx, essay_idx, DependencyType::SoftDepends, None));
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TestPolicy;

    fn scenario_requirements() -> RequirementProfile {
        RequirementProfile {
            test_policy: TestPolicy::TestBlind,
            common_app_essay_required: true,
            supplemental_essays_count: 3,
            teacher_recommendations_required: 2,
            counselor_recommendation_required: true,
            toefl_min: Some(100),
            ..Default::default()
        }
    }

    #[test]
    fn test_decomposition_emits_expected_tasks() {
        // International applicant: 1 main form + 1 main essay +
        // 3 supplementals + 2 teacher recs + 1 counselor rec + 1 TOEFL
        // + 1 final submit. Test-blind college, so no test-scores task.
        let tasks = decompose(&scenario_requirements(), true);
        assert_eq!(tasks.len(), 10);
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.canonical_kind == CanonicalTaskKind::SupplementalEssay)
                .count(),
            3
        );
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.canonical_kind == CanonicalTaskKind::TeacherRecommendation)
                .count(),
            2
        );
        assert!(tasks
            .iter()
            .any(|t| t.canonical_kind == CanonicalTaskKind::EnglishProficiency));

        // Domestic applicants skip the English-proficiency task.
        let domestic = decompose(&scenario_requirements(), false);
        assert_eq!(domestic.len(), 9);
    }

    #[test]
    fn test_final_submit_blocks_on_all_others() {
        let templates = decompose(&scenario_requirements(), true);
        let edges = dependencies(&templates);
        let final_idx = templates.len() - 1;

        let blocking: Vec<_> = edges
            .iter()
            .filter(|(task, _, dep_type, _)| {
                *task == final_idx && *dep_type == DependencyType::Blocks
            })
            .collect();
        assert_eq!(blocking.len(), templates.len() - 1);
    }

    #[test]
    fn test_supplementals_soft_depend_on_main_essay() {
        let templates = decompose(&scenario_requirements(), false);
        let edges = dependencies(&templates);
        let essay_idx = templates
            .iter()
            .position(|t| t.canonical_kind == CanonicalTaskKind::MainEssay)
            .unwrap();

        let soft: Vec<_> = edges
            .iter()
            .filter(|(_, dep, dep_type, _)| {
                *dep == essay_idx && *dep_type == DependencyType::SoftDepends
            })
            .collect();
        assert_eq!(soft.len(), 3);
    }

    #[test]
    fn test_recommendations_carry_lead_time() {
        let templates = decompose(&scenario_requirements(), false);
        let edges = dependencies(&templates);

        let advisory: Vec<_> = edges
            .iter()
            .filter(|(_, _, dep_type, lead)| {
                *dep_type == DependencyType::ShouldCompleteFirst
                    && *lead == Some(RECOMMENDATION_LEAD_DAYS)
            })
            .collect();
        // 2 teacher + 1 counselor
        assert_eq!(advisory.len(), 3);
    }

    #[test]
    fn test_test_scores_emitted_unless_test_blind() {
        let mut requirements = scenario_requirements();
        requirements.test_policy = TestPolicy::Optional;
        let tasks = decompose(&requirements, false);
        assert!(tasks
            .iter()
            .any(|t| t.canonical_kind == CanonicalTaskKind::TestScores));
    }

    #[test]
    fn test_minimal_requirements_still_have_form_and_submit() {
        let tasks = decompose(
            &RequirementProfile {
                test_policy: TestPolicy::TestBlind,
                ..Default::default()
            },
            false,
        );
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].canonical_kind, CanonicalTaskKind::MainForm);
        assert_eq!(tasks[1].canonical_kind, CanonicalTaskKind::FinalSubmit);
    }
}
