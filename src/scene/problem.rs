use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::error::{ScenecropError, ScenecropResult},
    scene::config::PlanningConfig,
};

/// Planning problem written next to the planning record.
pub const PROBLEM_FILE: &str = "problem.pddl";

/// Initial-state facts of the scene, each a predicate followed by its arguments.
///
/// Read from the `(:init ...)` section of `problem.pddl` when the scene has one,
/// otherwise from the record's `init_facts`.
pub fn init_facts(scene_dir: &Path, record: &PlanningConfig) -> ScenecropResult<Vec<Vec<String>>> {
    let path = problem_path(scene_dir);
    if !path.is_file() {
        return Ok(record.init_facts.clone());
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("read '{}'", path.display()))?;
    parse_init(&text)
        .map_err(|e| ScenecropError::config(format!("parse '{}': {e}", path.display())))
}

pub fn problem_path(scene_dir: &Path) -> PathBuf {
    scene_dir.join(PROBLEM_FILE)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    fn head(&self) -> Option<&str> {
        match self {
            Self::List(items) => match items.first() {
                Some(Self::Atom(a)) => Some(a),
                _ => None,
            },
            Self::Atom(_) => None,
        }
    }

    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            Self::Atom(a) => out.push(a.clone()),
            Self::List(items) => items.iter().for_each(|i| i.flatten_into(out)),
        }
    }
}

/// Facts of the `(:init ...)` section of a PDDL problem.
///
/// Nested terms are flattened, so `(= (cost) 0)` becomes `["=", "cost", "0"]`.
/// A problem without an init section has no facts.
pub fn parse_init(text: &str) -> Result<Vec<Vec<String>>, String> {
    let tokens = tokenize(text);
    let mut pos = 0;
    let mut roots = Vec::new();
    while pos < tokens.len() {
        roots.push(parse_sexp(&tokens, &mut pos)?);
    }

    let Some(Sexp::List(items)) = roots.iter().find_map(find_init) else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .skip(1)
        .filter_map(|fact| match fact {
            Sexp::List(_) => {
                let mut atoms = Vec::new();
                fact.flatten_into(&mut atoms);
                Some(atoms)
            }
            Sexp::Atom(_) => None,
        })
        .collect())
}

fn find_init(node: &Sexp) -> Option<&Sexp> {
    if node
        .head()
        .is_some_and(|h| h.eq_ignore_ascii_case(":init"))
    {
        return Some(node);
    }
    match node {
        Sexp::List(items) => items.iter().find_map(find_init),
        Sexp::Atom(_) => None,
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.split(';').next().unwrap_or_default();
        let mut start = None;
        for (i, c) in line.char_indices() {
            if c == '(' || c == ')' || c.is_whitespace() {
                if let Some(s) = start.take() {
                    out.push(&line[s..i]);
                }
                if !c.is_whitespace() {
                    out.push(&line[i..i + 1]);
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            out.push(&line[s..]);
        }
    }
    out
}

fn parse_sexp(tokens: &[&str], pos: &mut usize) -> Result<Sexp, String> {
    let Some(&tok) = tokens.get(*pos) else {
        return Err("unexpected end of input".to_string());
    };
    *pos += 1;
    match tok {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(&")") => {
                        *pos += 1;
                        return Ok(Sexp::List(items));
                    }
                    Some(_) => items.push(parse_sexp(tokens, pos)?),
                    None => return Err("unbalanced '('".to_string()),
                }
            }
        }
        ")" => Err("unbalanced ')'".to_string()),
        atom => Ok(Sexp::Atom(atom.to_string())),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/problem.rs"]
mod tests;
