//! Canonical text rendering of specifications.
//!
//! The output is accepted by [`crate::parse_specification`] and parses back
//! to an equal value.

use crate::model::{Condition, Match, PathCondition, Projection, Role, Specification};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let given = self
            .given
            .iter()
            .map(|label| format!("{}: {}", label.name, label.fact_type))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({}) ", given)?;
        write_matches(f, &self.matches, 0)?;
        write_projections(f, &self.projections, 0)
    }
}

fn pad(f: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_matches(f: &mut impl Write, matches: &[Match], depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for m in matches {
        pad(f, depth + 1)?;
        writeln!(f, "{}: {} [", m.unknown.name, m.unknown.fact_type)?;
        for condition in &m.conditions {
            pad(f, depth + 2)?;
            match condition {
                Condition::Path(path) => {
                    write_path(f, &m.unknown.name, path)?;
                    f.write_str("\n")?;
                }
                Condition::Existential(existential) => {
                    if !existential.exists {
                        f.write_str("!")?;
                    }
                    f.write_str("E ")?;
                    write_matches(f, &existential.matches, depth + 2)?;
                    f.write_str("\n")?;
                }
            }
        }
        pad(f, depth + 1)?;
        f.write_str("]\n")?;
    }
    pad(f, depth)?;
    f.write_str("}")
}

fn write_roles(f: &mut impl Write, roles: &[Role]) -> fmt::Result {
    for role in roles {
        write!(f, "->{}: {}", role.name, role.target_type)?;
    }
    Ok(())
}

fn write_path(f: &mut impl Write, unknown: &str, path: &PathCondition) -> fmt::Result {
    f.write_str(unknown)?;
    write_roles(f, &path.roles_left)?;
    write!(f, " = {}", path.label_right)?;
    write_roles(f, &path.roles_right)
}

fn write_projections(f: &mut impl Write, projections: &[Projection], depth: usize) -> fmt::Result {
    match projections {
        [] => Ok(()),
        [single] if single.name().is_empty() && !matches!(single, Projection::Specification(_)) => {
            f.write_str(" => ")?;
            write_scalar(f, single)
        }
        _ => {
            f.write_str(" => {\n")?;
            for projection in projections {
                pad(f, depth + 1)?;
                f.write_str(projection.name())?;
                match projection {
                    Projection::Specification(nested) => {
                        f.write_str(" ")?;
                        write_matches(f, &nested.matches, depth + 1)?;
                        write_projections(f, &nested.projections, depth + 1)?;
                    }
                    scalar => {
                        f.write_str(" = ")?;
                        write_scalar(f, scalar)?;
                    }
                }
                f.write_str("\n")?;
            }
            pad(f, depth)?;
            f.write_str("}")
        }
    }
}

fn write_scalar(f: &mut impl Write, projection: &Projection) -> fmt::Result {
    match projection {
        Projection::Field { label, field, .. } => write!(f, "{}.{}", label, field),
        Projection::Hash { label, .. } => write!(f, "#{}", label),
        Projection::Fact { label, .. } => f.write_str(label),
        Projection::Specification(_) => Ok(()),
    }
}
