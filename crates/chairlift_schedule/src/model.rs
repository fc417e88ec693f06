//! Mixed-integer model container.
//!
//! The builder assembles variables, linear constraints, and a maximize
//! objective here; the model then serializes to CPLEX LP format for
//! whichever solver binary is configured. Decoupling from any one
//! solver's programmatic API keeps the exchange at the file level.

use crate::error::{Result, ScheduleError};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Index of a variable within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    LessEq,
    GreaterEq,
    Equal,
}

impl ConstraintSense {
    fn lp_symbol(&self) -> &'static str {
        match self {
            ConstraintSense::LessEq => "<=",
            ConstraintSense::GreaterEq => ">=",
            ConstraintSense::Equal => "=",
        }
    }
}

/// One linear constraint: `terms (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(f64, VarId)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

/// Binary MIP with a maximize objective.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MipModel {
    name: String,
    variables: Vec<String>,
    index: HashMap<String, VarId>,
    constraints: Vec<Constraint>,
    objective: Vec<(f64, VarId)>,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intern a binary variable by name.
    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        let name = name.into();
        if let Some(&id) = self.index.get(&name) {
            return id;
        }
        let id = VarId(self.variables.len());
        self.index.insert(name.clone(), id);
        self.variables.push(name);
        id
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub fn var_name(&self, id: VarId) -> &str {
        &self.variables[id.0]
    }

    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = (VarId, &str)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(index, name)| (VarId(index), name.as_str()))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Add a constraint; zero-coefficient terms are dropped and terms
    /// on the same variable are merged so the matrix is canonical.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(f64, VarId)>,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms: merge_terms(terms),
            sense,
            rhs,
        });
    }

    /// Accumulate onto the maximize objective.
    pub fn objective_term(&mut self, coefficient: f64, variable: VarId) {
        if coefficient != 0.0 {
            self.objective.push((coefficient, variable));
        }
    }

    /// The objective with merged, ordered terms.
    pub fn objective(&self) -> Vec<(f64, VarId)> {
        merge_terms(self.objective.clone())
    }

    /// Verify a variable assignment against every constraint. Missing
    /// variables count as 0, matching solver output conventions.
    pub fn check_solution(&self, values: &HashMap<String, f64>) -> std::result::Result<(), String> {
        for constraint in &self.constraints {
            let lhs: f64 = constraint
                .terms
                .iter()
                .map(|(coefficient, id)| {
                    coefficient * values.get(self.var_name(*id)).copied().unwrap_or(0.0)
                })
                .sum();
            let ok = match constraint.sense {
                ConstraintSense::LessEq => lhs <= constraint.rhs + 1e-6,
                ConstraintSense::GreaterEq => lhs >= constraint.rhs - 1e-6,
                ConstraintSense::Equal => (lhs - constraint.rhs).abs() <= 1e-6,
            };
            if !ok {
                return Err(format!(
                    "constraint {} violated: {lhs} {} {}",
                    constraint.name,
                    constraint.sense.lp_symbol(),
                    constraint.rhs
                ));
            }
        }
        Ok(())
    }

    /// Evaluate the objective against a solved assignment.
    pub fn objective_value(&self, values: &HashMap<String, f64>) -> f64 {
        self.objective()
            .iter()
            .map(|(coefficient, id)| {
                coefficient * values.get(self.var_name(*id)).copied().unwrap_or(0.0)
            })
            .sum()
    }

    // ========================================================================
    // LP exchange format
    // ========================================================================

    /// Serialize to CPLEX LP format. Every variable is declared in the
    /// `Binary` section; constraint and objective terms keep variable
    /// order so output is deterministic.
    pub fn to_lp(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\ {}", self.name);
        out.push_str("Maximize\n");
        let _ = write!(out, " obj:");
        self.write_terms(&mut out, &self.objective());
        out.push('\n');

        out.push_str("Subject To\n");
        for constraint in &self.constraints {
            let _ = write!(out, " {}:", constraint.name);
            self.write_terms(&mut out, &constraint.terms);
            let _ = writeln!(
                out,
                " {} {}",
                constraint.sense.lp_symbol(),
                format_number(constraint.rhs)
            );
        }

        out.push_str("Binary\n");
        for name in &self.variables {
            let _ = writeln!(out, " {name}");
        }
        out.push_str("End\n");
        out
    }

    fn write_terms(&self, out: &mut String, terms: &[(f64, VarId)]) {
        if terms.is_empty() {
            out.push_str(" 0");
            return;
        }
        for (position, (coefficient, id)) in terms.iter().enumerate() {
            let magnitude = coefficient.abs();
            let sign = if *coefficient < 0.0 {
                " -"
            } else if position == 0 {
                " "
            } else {
                " +"
            };
            let _ = write!(
                out,
                "{sign} {} {}",
                format_number(magnitude),
                self.var_name(*id)
            );
        }
    }

    /// Parse a model previously written by [`MipModel::to_lp`].
    ///
    /// This is deliberately limited to the canonical form the writer
    /// emits; it exists so the coefficient matrix survives the file
    /// round-trip byte for byte.
    pub fn from_lp(input: &str) -> Result<Self> {
        let mut model = MipModel::default();

        // Pre-intern variables from the Binary section so the parsed
        // model keeps the writer's variable order.
        let mut in_binaries = false;
        for raw in input.lines() {
            let line = raw.trim();
            match line {
                "Binary" => in_binaries = true,
                "End" => in_binaries = false,
                "" => {}
                _ if in_binaries => {
                    model.binary(line.to_string());
                }
                _ => {}
            }
        }

        let mut section = LpSection::Preamble;
        for (line_no, raw) in input.lines().enumerate() {
            let line = raw.trim();
            let fail = |cause: &str| ScheduleError::Lp {
                line: line_no + 1,
                cause: cause.to_string(),
            };

            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('\\') {
                if model.name.is_empty() {
                    model.name = comment.trim().to_string();
                }
                continue;
            }
            match line {
                "Maximize" => {
                    section = LpSection::Objective;
                    continue;
                }
                "Subject To" => {
                    section = LpSection::Constraints;
                    continue;
                }
                "Binary" => {
                    section = LpSection::Binaries;
                    continue;
                }
                "End" => break,
                _ => {}
            }

            match section {
                LpSection::Preamble => return Err(fail("unexpected line before Maximize")),
                LpSection::Objective => {
                    let body = line
                        .strip_prefix("obj:")
                        .ok_or_else(|| fail("objective must be labeled obj:"))?;
                    for (coefficient, name) in parse_terms(body, line_no + 1)? {
                        let id = model.binary(name);
                        model.objective.push((coefficient, id));
                    }
                }
                LpSection::Constraints => {
                    let (name, body) = line
                        .split_once(':')
                        .ok_or_else(|| fail("constraint missing label"))?;
                    let (terms_part, sense, rhs_part) = split_relation(body)
                        .ok_or_else(|| fail("constraint missing relation"))?;
                    let rhs: f64 = rhs_part
                        .trim()
                        .parse()
                        .map_err(|_| fail("bad right-hand side"))?;
                    let mut terms = Vec::new();
                    for (coefficient, var) in parse_terms(terms_part, line_no + 1)? {
                        let id = model.binary(var);
                        terms.push((coefficient, id));
                    }
                    model.constraints.push(Constraint {
                        name: name.trim().to_string(),
                        terms: merge_terms(terms),
                        sense,
                        rhs,
                    });
                }
                LpSection::Binaries => {
                    model.binary(line.to_string());
                }
            }
        }
        Ok(model)
    }
}

enum LpSection {
    Preamble,
    Objective,
    Constraints,
    Binaries,
}

/// Merge duplicate variables, drop zeros, order by variable index.
fn merge_terms(terms: Vec<(f64, VarId)>) -> Vec<(f64, VarId)> {
    let mut merged: HashMap<VarId, f64> = HashMap::new();
    for (coefficient, id) in terms {
        *merged.entry(id).or_insert(0.0) += coefficient;
    }
    let mut out: Vec<(f64, VarId)> = merged
        .into_iter()
        .filter(|(_, coefficient)| *coefficient != 0.0)
        .map(|(id, coefficient)| (coefficient, id))
        .collect();
    out.sort_by_key(|(_, id)| *id);
    out
}

/// Plain decimal output; LP readers reject exponent notation.
fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{value:.9}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn split_relation(body: &str) -> Option<(&str, ConstraintSense, &str)> {
    for (symbol, sense) in [
        ("<=", ConstraintSense::LessEq),
        (">=", ConstraintSense::GreaterEq),
        ("=", ConstraintSense::Equal),
    ] {
        if let Some(position) = body.find(symbol) {
            let (lhs, rest) = body.split_at(position);
            return Some((lhs, sense, &rest[symbol.len()..]));
        }
    }
    None
}

/// Parse `+ 2 x0 - 0.5 x3`-style term lists written by `write_terms`.
fn parse_terms(body: &str, line: usize) -> Result<Vec<(f64, String)>> {
    let fail = |cause: &str| ScheduleError::Lp {
        line,
        cause: cause.to_string(),
    };
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens == ["0"] {
        return Ok(Vec::new());
    }
    let mut terms = Vec::new();
    let mut cursor = 0;
    while cursor < tokens.len() {
        let mut sign = 1.0;
        match tokens[cursor] {
            "+" => cursor += 1,
            "-" => {
                sign = -1.0;
                cursor += 1;
            }
            _ => {}
        }
        let coefficient: f64 = tokens
            .get(cursor)
            .ok_or_else(|| fail("dangling sign"))?
            .parse()
            .map_err(|_| fail("bad coefficient"))?;
        let name = tokens
            .get(cursor + 1)
            .ok_or_else(|| fail("coefficient without variable"))?;
        terms.push((sign * coefficient, name.to_string()));
        cursor += 2;
    }
    Ok(terms)
}
