//! Parser for the descriptive specification syntax.
//!
//! ```text
//! (blog: Blog) {
//!     post: Post [
//!         post->blog: Blog = blog
//!         !E {
//!             deleted: Post.Deleted [
//!                 deleted->post: Post = post
//!             ]
//!         }
//!     ]
//! } => {
//!     titles {
//!         title: Post.Title [
//!             title->post: Post = post
//!         ]
//!     }
//! }
//! ```
//!
//! The grammar lives in `specification.pest`; this module turns the parse
//! tree into the model and validates the result.

use crate::error::{SpecError, SpecResult};
use crate::model::{
    Condition, ExistentialCondition, Label, Match, PathCondition, Projection, Role, Specification,
    SpecificationProjection,
};
use crate::validate::validate;
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Span};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "specification.pest"]
struct SpecificationParser;

/// Parse and validate a specification
///
/// # Errors
///
/// Returns error if the text is not valid syntax or the specification is
/// not well formed
pub fn parse_specification(input: &str) -> SpecResult<Specification> {
    let mut pairs = SpecificationParser::parse(Rule::specification, input).map_err(syntax_error)?;
    let root = pairs.next().ok_or_else(|| SpecError::Parse {
        line: 1,
        column: 1,
        message: "expected specification".to_string(),
    })?;
    let spec = specification(root)?;
    validate(&spec)?;
    Ok(spec)
}

fn syntax_error(err: pest::error::Error<Rule>) -> SpecError {
    let err = err.renamed_rules(describe_rule);
    let (line, column) = match err.line_col {
        LineColLocation::Pos(position) | LineColLocation::Span(position, _) => position,
    };
    SpecError::Parse {
        line,
        column,
        message: err.variant.message().into_owned(),
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input",
        Rule::identifier => "identifier",
        Rule::label => "label",
        Rule::match_block => "'{'",
        Rule::match_clause => "match",
        Rule::negative_existential | Rule::positive_existential => "existential condition",
        Rule::path_condition => "path condition",
        Rule::role => "role",
        Rule::projection_block => "projection",
        Rule::named_projection => "named projection",
        other => return format!("{:?}", other),
    }
    .to_string()
}

fn error_at(span: Span<'_>, message: impl Into<String>) -> SpecError {
    let (line, column) = span.start_pos().line_col();
    SpecError::Parse {
        line,
        column,
        message: message.into(),
    }
}

/// Next child of a node the grammar guarantees to be present
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'_>, expected: &str) -> SpecResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| error_at(span, format!("expected {}", expected)))
}

fn identifier(pairs: &mut Pairs<'_, Rule>, span: Span<'_>, expected: &str) -> SpecResult<String> {
    Ok(next_pair(pairs, span, expected)?.as_str().to_string())
}

fn specification(pair: Pair<'_, Rule>) -> SpecResult<Specification> {
    let mut given = Vec::new();
    let mut matches = Vec::new();
    let mut projections = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::label => given.push(label(inner)?),
            Rule::match_block => matches = match_block(inner)?,
            Rule::projection_block => projections = projection_block(inner)?,
            _ => {}
        }
    }
    Ok(Specification::new(given, matches, projections))
}

fn label(pair: Pair<'_, Rule>) -> SpecResult<Label> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let name = identifier(&mut inner, span, "label name")?;
    let fact_type = identifier(&mut inner, span, "fact type")?;
    Ok(Label::new(name, fact_type))
}

fn match_block(pair: Pair<'_, Rule>) -> SpecResult<Vec<Match>> {
    pair.into_inner().map(match_clause).collect()
}

fn match_clause(pair: Pair<'_, Rule>) -> SpecResult<Match> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let unknown = label(next_pair(&mut inner, span, "label")?)?;
    let conditions = inner
        .map(|pair| condition(pair, &unknown))
        .collect::<SpecResult<Vec<_>>>()?;
    Ok(Match::new(unknown, conditions))
}

fn condition(pair: Pair<'_, Rule>, unknown: &Label) -> SpecResult<Condition> {
    match pair.as_rule() {
        Rule::negative_existential | Rule::positive_existential => {
            let exists = pair.as_rule() == Rule::positive_existential;
            let span = pair.as_span();
            let block = next_pair(&mut pair.into_inner(), span, "'{'")?;
            Ok(Condition::Existential(ExistentialCondition::new(
                exists,
                match_block(block)?,
            )))
        }
        _ => path_condition(pair, unknown).map(Condition::Path),
    }
}

/// The side naming the unknown becomes the left-hand side
fn path_condition(pair: Pair<'_, Rule>, unknown: &Label) -> SpecResult<PathCondition> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let (left_label, left_roles) = side(next_pair(&mut inner, span, "label")?)?;
    let (right_label, right_roles) = side(next_pair(&mut inner, span, "label")?)?;

    if left_label == unknown.name {
        Ok(PathCondition::new(left_roles, right_label, right_roles))
    } else if right_label == unknown.name {
        Ok(PathCondition::new(right_roles, left_label, left_roles))
    } else {
        Err(error_at(
            span,
            format!("path condition must refer to {}", unknown.name),
        ))
    }
}

fn side(pair: Pair<'_, Rule>) -> SpecResult<(String, Vec<Role>)> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let label = identifier(&mut inner, span, "label")?;
    let roles = inner
        .map(|role| {
            let span = role.as_span();
            let mut parts = role.into_inner();
            let name = identifier(&mut parts, span, "role name")?;
            let target_type = identifier(&mut parts, span, "fact type")?;
            Ok(Role::new(name, target_type))
        })
        .collect::<SpecResult<Vec<_>>>()?;
    Ok((label, roles))
}

fn projection_block(pair: Pair<'_, Rule>) -> SpecResult<Vec<Projection>> {
    pair.into_inner()
        .map(|inner| match inner.as_rule() {
            Rule::named_projection => named_projection(inner),
            _ => scalar_projection(inner, String::new()),
        })
        .collect()
}

fn named_projection(pair: Pair<'_, Rule>) -> SpecResult<Projection> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let name = identifier(&mut inner, span, "projection name")?;
    let body = next_pair(&mut inner, span, "projection")?;
    match body.as_rule() {
        Rule::specification_projection => {
            let mut matches = Vec::new();
            let mut projections = Vec::new();
            for part in body.into_inner() {
                match part.as_rule() {
                    Rule::match_block => matches = match_block(part)?,
                    _ => projections = projection_block(part)?,
                }
            }
            Ok(Projection::Specification(SpecificationProjection {
                name,
                matches,
                projections,
            }))
        }
        _ => scalar_projection(body, name),
    }
}

fn scalar_projection(pair: Pair<'_, Rule>, name: String) -> SpecResult<Projection> {
    let span = pair.as_span();
    let rule = pair.as_rule();
    let reference = identifier(&mut pair.into_inner(), span, "label")?;
    if rule == Rule::hash_projection {
        return Ok(Projection::Hash {
            name,
            label: reference,
        });
    }
    match reference.split_once('.') {
        Some((label, field)) => Ok(Projection::Field {
            name,
            label: label.to_string(),
            field: field.to_string(),
        }),
        None => Ok(Projection::Fact {
            name,
            label: reference,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let spec = parse_specification(
            "(parent: MyApp.Parent) {
                child: MyApp.Child [
                    child->parent:MyApp.Parent = parent
                ]
            }",
        )
        .unwrap();
        let expected = Specification::new(
            vec![Label::new("parent", "MyApp.Parent")],
            vec![Match::new(
                Label::new("child", "MyApp.Child"),
                vec![Condition::Path(PathCondition::new(
                    vec![Role::new("parent", "MyApp.Parent")],
                    "parent",
                    vec![],
                ))],
            )],
            vec![],
        );
        assert_eq!(spec, expected);
    }

    #[test]
    fn test_parse_predecessor_join() {
        let spec = parse_specification(
            "(root: Root) {
                project: Project [ project->root: Root = root ]
                other: Other [ other = project->other: Other ]
            }",
        )
        .unwrap();
        let path = spec.matches[1].path_condition().unwrap();
        assert!(path.roles_left.is_empty());
        assert_eq!(path.label_right, "project");
        assert_eq!(path.roles_right, vec![Role::new("other", "Other")]);
    }

    #[test]
    fn test_parse_swapped_sides() {
        let spec = parse_specification(
            "(blog: Blog) { post: Post [ blog = post->blog: Blog ] }",
        )
        .unwrap();
        let path = spec.matches[0].path_condition().unwrap();
        assert_eq!(path.roles_left, vec![Role::new("blog", "Blog")]);
        assert_eq!(path.label_right, "blog");
    }

    #[test]
    fn test_parse_existential_conditions() {
        let spec = parse_specification(
            "(root: Root) {
                project: Project [
                    project->root: Root = root
                    E { a: Assignment [ a->project: Project = project ] }
                    !E { d: Project.Deleted [ d->project: Project = project ] }
                ]
            }",
        )
        .unwrap();
        let existentials: Vec<_> = spec.matches[0].existential_conditions().collect();
        assert_eq!(existentials.len(), 2);
        assert!(existentials[0].exists);
        assert!(!existentials[1].exists);
        assert_eq!(existentials[1].matches[0].unknown.fact_type, "Project.Deleted");
    }

    #[test]
    fn test_parse_multiple_givens() {
        let spec = parse_specification(
            "(root: Root, user: Jinaga.User) {
                a: Assignment [ a->user: Jinaga.User = user ]
            }",
        )
        .unwrap();
        assert_eq!(spec.given.len(), 2);
        assert_eq!(spec.given[1].fact_type, "Jinaga.User");
    }

    #[test]
    fn test_parse_projections() {
        let spec = parse_specification(
            "(root: Root) {
                project: Project [ project->root: Root = root ]
            } => {
                names {
                    name: Project.Name [ name->project: Project = project ]
                } => name.value
                id = #project
                identifier = project.identifier
                it = project
            }",
        )
        .unwrap();
        assert_eq!(spec.projections.len(), 4);
        match &spec.projections[0] {
            Projection::Specification(nested) => {
                assert_eq!(nested.name, "names");
                assert_eq!(nested.matches.len(), 1);
                assert_eq!(
                    nested.projections,
                    vec![Projection::Field {
                        name: String::new(),
                        label: "name".to_string(),
                        field: "value".to_string(),
                    }]
                );
            }
            other => panic!("unexpected projection {:?}", other),
        }
        assert!(matches!(&spec.projections[1], Projection::Hash { name, .. } if name == "id"));
        assert!(matches!(&spec.projections[2], Projection::Field { field, .. } if field == "identifier"));
        assert!(matches!(&spec.projections[3], Projection::Fact { label, .. } if label == "project"));
    }

    #[test]
    fn test_parse_single_field_projection() {
        let spec = parse_specification(
            "(p1: Company) { u1: Office [ u1->company: Company = p1 ] } => u1.identifier",
        )
        .unwrap();
        assert_eq!(
            spec.projections,
            vec![Projection::Field {
                name: String::new(),
                label: "u1".to_string(),
                field: "identifier".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_comments() {
        let spec = parse_specification(
            "// offices of a company
            (c: Company) {
                o: Office [ o->company: Company = c ] // join
            }",
        )
        .unwrap();
        assert_eq!(spec.matches.len(), 1);
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse_specification("(blog: Blog) {\n  post: Post [\n    post->blog Blog = blog\n  ]\n}")
            .unwrap_err();
        match err {
            SpecError::Parse { line, column, .. } => {
                assert_eq!(line, 3);
                assert!(column >= 5);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_names_expectation() {
        let err = parse_specification("(blog: Blog) { post: Post [ post->blog: Blog = blog ]").unwrap_err();
        assert!(matches!(err, SpecError::Parse { line: 1, ref message, .. } if message.starts_with("expected")));
    }

    #[test]
    fn test_parse_keyword_prefix_is_label() {
        let spec = parse_specification(
            "(Entry: Blog) { post: Post [ Entry = post->blog: Blog ] }",
        )
        .unwrap();
        let path = spec.matches[0].path_condition().unwrap();
        assert_eq!(path.label_right, "Entry");
        assert_eq!(path.roles_left, vec![Role::new("blog", "Blog")]);
    }

    #[test]
    fn test_parse_detached_path_position() {
        let err = parse_specification("(blog: Blog) {\n  post: Post [ blog = blog ]\n}").unwrap_err();
        assert_eq!(
            err,
            SpecError::Parse {
                line: 2,
                column: 16,
                message: "path condition must refer to post".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_detached_path() {
        let err = parse_specification("(blog: Blog) { post: Post [ blog = blog ] }").unwrap_err();
        assert!(matches!(err, SpecError::Parse { message, .. } if message.contains("must refer to post")));
    }

    #[test]
    fn test_parse_validates() {
        let err = parse_specification("(blog: Blog) { post: Post [ post->blog: Blog = site ] }")
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownLabel {
                name: "site".to_string()
            }
        );
    }

    #[test]
    fn test_parse_trailing_input() {
        let err = parse_specification("(blog: Blog) { } }").unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
    }
}
