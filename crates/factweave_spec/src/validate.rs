//! Well-formedness checks for specifications.

use crate::error::{SpecError, SpecResult};
use crate::model::{Condition, Label, Match, PathCondition, Projection, Specification};
use indexmap::IndexMap;

/// Labels in scope, mapped to their fact types
type Scope = IndexMap<String, String>;

/// Validate a specification
///
/// Checks, in declaration order, that every match carries exactly one path
/// condition, every referenced label is in scope, no label is declared twice
/// in one scope, and both sides of every path condition reach the same type.
///
/// # Errors
///
/// Returns the first violation found
pub fn validate(spec: &Specification) -> SpecResult<()> {
    let mut scope = Scope::new();
    for label in &spec.given {
        declare(&mut scope, label)?;
    }
    validate_matches(&spec.matches, &mut scope)?;
    validate_projections(&spec.projections, &scope)
}

fn declare(scope: &mut Scope, label: &Label) -> SpecResult<()> {
    if scope.contains_key(&label.name) {
        return Err(SpecError::DuplicateLabel {
            name: label.name.clone(),
        });
    }
    scope.insert(label.name.clone(), label.fact_type.clone());
    Ok(())
}

fn validate_matches(matches: &[Match], scope: &mut Scope) -> SpecResult<()> {
    for m in matches {
        declare(scope, &m.unknown)?;
        let count = m.path_conditions().count();
        if count != 1 {
            return Err(SpecError::PathConditionCount {
                label: m.unknown.name.clone(),
                count,
            });
        }
        for condition in &m.conditions {
            match condition {
                Condition::Path(path) => validate_path(&m.unknown, path, scope)?,
                Condition::Existential(existential) => {
                    let mut inner = scope.clone();
                    validate_matches(&existential.matches, &mut inner)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_path(unknown: &Label, path: &PathCondition, scope: &Scope) -> SpecResult<()> {
    if path.label_right == unknown.name {
        return Err(SpecError::DetachedPathCondition {
            label: unknown.name.clone(),
        });
    }
    let right_type = scope
        .get(&path.label_right)
        .ok_or_else(|| SpecError::UnknownLabel {
            name: path.label_right.clone(),
        })?;

    let left_end = path
        .roles_left
        .last()
        .map_or(unknown.fact_type.as_str(), |role| role.target_type.as_str());
    let right_end = path
        .roles_right
        .last()
        .map_or(right_type.as_str(), |role| role.target_type.as_str());
    if left_end != right_end {
        return Err(SpecError::PathTypeMismatch {
            label: unknown.name.clone(),
            left: left_end.to_string(),
            right: right_end.to_string(),
        });
    }
    Ok(())
}

fn validate_projections(projections: &[Projection], scope: &Scope) -> SpecResult<()> {
    for projection in projections {
        match projection {
            Projection::Field { label, .. }
            | Projection::Hash { label, .. }
            | Projection::Fact { label, .. } => {
                if !scope.contains_key(label) {
                    return Err(SpecError::UnknownLabel { name: label.clone() });
                }
            }
            Projection::Specification(nested) => {
                let mut inner = scope.clone();
                validate_matches(&nested.matches, &mut inner)?;
                validate_projections(&nested.projections, &inner)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExistentialCondition, Role, SpecificationProjection};

    fn post_match(right: &str) -> Match {
        Match::new(
            Label::new("post", "Post"),
            vec![Condition::Path(PathCondition::new(
                vec![Role::new("blog", "Blog")],
                right,
                vec![],
            ))],
        )
    }

    fn blog() -> Vec<Label> {
        vec![Label::new("blog", "Blog")]
    }

    #[test]
    fn test_valid_specification() {
        let spec = Specification::new(blog(), vec![post_match("blog")], vec![]);
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn test_unknown_label() {
        let spec = Specification::new(blog(), vec![post_match("site")], vec![]);
        assert_eq!(
            validate(&spec),
            Err(SpecError::UnknownLabel {
                name: "site".to_string()
            })
        );
    }

    #[test]
    fn test_missing_path_condition() {
        let m = Match::new(Label::new("post", "Post"), vec![]);
        let spec = Specification::new(blog(), vec![m], vec![]);
        assert!(matches!(
            validate(&spec),
            Err(SpecError::PathConditionCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_label() {
        let spec = Specification::new(blog(), vec![post_match("blog"), post_match("blog")], vec![]);
        assert_eq!(
            validate(&spec),
            Err(SpecError::DuplicateLabel {
                name: "post".to_string()
            })
        );
    }

    #[test]
    fn test_type_mismatch() {
        let m = Match::new(
            Label::new("post", "Post"),
            vec![Condition::Path(PathCondition::new(
                vec![Role::new("author", "User")],
                "blog",
                vec![],
            ))],
        );
        let spec = Specification::new(blog(), vec![m], vec![]);
        assert!(matches!(validate(&spec), Err(SpecError::PathTypeMismatch { .. })));
    }

    #[test]
    fn test_existential_scope_is_local() {
        let mut m = post_match("blog");
        m.conditions.push(Condition::Existential(ExistentialCondition::new(
            false,
            vec![Match::new(
                Label::new("deleted", "Post.Deleted"),
                vec![Condition::Path(PathCondition::new(
                    vec![Role::new("post", "Post")],
                    "post",
                    vec![],
                ))],
            )],
        )));
        let projection = Projection::Hash {
            name: "gone".to_string(),
            label: "deleted".to_string(),
        };
        let spec = Specification::new(blog(), vec![m], vec![projection]);
        assert_eq!(
            validate(&spec),
            Err(SpecError::UnknownLabel {
                name: "deleted".to_string()
            })
        );
    }

    #[test]
    fn test_nested_projection_scope() {
        let nested = SpecificationProjection {
            name: "titles".to_string(),
            matches: vec![Match::new(
                Label::new("title", "Post.Title"),
                vec![Condition::Path(PathCondition::new(
                    vec![Role::new("post", "Post")],
                    "post",
                    vec![],
                ))],
            )],
            projections: vec![Projection::Field {
                name: "value".to_string(),
                label: "title".to_string(),
                field: "value".to_string(),
            }],
        };
        let spec = Specification::new(
            blog(),
            vec![post_match("blog")],
            vec![Projection::Specification(nested)],
        );
        assert!(validate(&spec).is_ok());
    }
}
