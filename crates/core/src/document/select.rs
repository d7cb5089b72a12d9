//! Path selector for querying the layout tree.
//!
//! Supported grammar, a small subset of XPath:
//!
//! ```text
//! path      := ["/" | "//"] step (("/" | "//") step)*
//! step      := name | "*" | "." | ".." followed by predicate*
//! predicate := "[@" attr "]" | "[@" attr "=" quoted "]"
//! ```
//!
//! A leading `/` or `//` anchors the path at the document root, otherwise it
//! is evaluated relative to the base node. Results are in document order.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{LayoutError, Result};

use super::tree::{LayoutDocument, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Has(String),
    Equals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A parsed selector path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    absolute: bool,
    steps: Vec<Step>,
}

fn invalid(path: &str, msg: &str) -> LayoutError {
    LayoutError::validation(format!("invalid selector {path:?}: {msg}"))
}

fn parse_predicate(path: &str, body: &str) -> Result<Predicate> {
    let body = body.trim();
    let attr = body
        .strip_prefix('@')
        .ok_or_else(|| invalid(path, "predicates must test an attribute"))?;
    match attr.split_once('=') {
        None => {
            let name = attr.trim();
            if name.is_empty() {
                return Err(invalid(path, "empty attribute name"));
            }
            Ok(Predicate::Has(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| invalid(path, "attribute value must be quoted"))?;
            if name.is_empty() {
                return Err(invalid(path, "empty attribute name"));
            }
            Ok(Predicate::Equals(name.to_string(), unquoted.to_string()))
        }
    }
}

fn parse_step(path: &str, axis: Axis, text: &str) -> Result<Step> {
    let (head, mut rest) = match text.find('[') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let test = match head.trim() {
        "" => return Err(invalid(path, "empty step")),
        "*" => NodeTest::Any,
        "." => NodeTest::SelfNode,
        ".." => NodeTest::Parent,
        name => {
            if !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(invalid(path, "bad element name"));
            }
            NodeTest::Name(name.to_string())
        }
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let body_end = rest
            .find(']')
            .ok_or_else(|| invalid(path, "unterminated predicate"))?;
        if !rest.starts_with('[') {
            return Err(invalid(path, "unexpected text after predicate"));
        }
        predicates.push(parse_predicate(path, &rest[1..body_end])?);
        rest = &rest[body_end + 1..];
    }
    Ok(Step {
        axis,
        test,
        predicates,
    })
}

impl Selector {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(invalid(path, "empty path"));
        }
        let absolute = trimmed.starts_with('/');

        let mut steps = Vec::new();
        let mut axis = Axis::Child;
        let mut current = String::new();
        let mut in_brackets = false;
        let mut quote: Option<char> = None;
        let mut chars = trimmed.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\'' | '"' if in_brackets => {
                    match quote {
                        Some(q) if q == c => quote = None,
                        None => quote = Some(c),
                        _ => {}
                    }
                    current.push(c);
                }
                '[' if quote.is_none() => {
                    in_brackets = true;
                    current.push(c);
                }
                ']' if quote.is_none() => {
                    in_brackets = false;
                    current.push(c);
                }
                '/' if !in_brackets => {
                    if !current.is_empty() {
                        steps.push(parse_step(path, axis, &current)?);
                        current.clear();
                        axis = Axis::Child;
                    } else if !steps.is_empty() || axis == Axis::Descendant {
                        return Err(invalid(path, "empty step"));
                    }
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        axis = Axis::Descendant;
                    }
                }
                _ => current.push(c),
            }
        }
        if in_brackets || quote.is_some() {
            return Err(invalid(path, "unterminated predicate"));
        }
        if current.is_empty() {
            return Err(invalid(path, "path ends with a separator"));
        }
        steps.push(parse_step(path, axis, &current)?);

        Ok(Self { absolute, steps })
    }

    /// Evaluates the selector on `doc`. `base` defaults to the root.
    pub fn evaluate(&self, doc: &LayoutDocument, base: Option<NodeId>) -> Result<Vec<NodeId>> {
        let base = base.unwrap_or_else(|| doc.root());
        doc.check_alive(base)?;

        // None stands for the virtual node above the root element
        let mut context: Vec<Option<NodeId>> = if self.absolute {
            vec![None]
        } else {
            vec![Some(base)]
        };

        for step in &self.steps {
            let mut seen: FxHashSet<NodeId> = FxHashSet::default();
            let mut next = Vec::new();
            for &ctx in &context {
                for n in step_candidates(doc, ctx, step) {
                    if matches_predicates(doc, n, &step.predicates) && seen.insert(n) {
                        next.push(Some(n));
                    }
                }
            }
            context = next;
        }

        let rank: FxHashMap<NodeId, usize> = std::iter::once(doc.root())
            .chain(doc.descendants(doc.root()))
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        let mut result: Vec<NodeId> = context.into_iter().flatten().collect();
        result.sort_by_key(|n| rank.get(n).copied().unwrap_or(usize::MAX));
        Ok(result)
    }
}

fn step_candidates(doc: &LayoutDocument, ctx: Option<NodeId>, step: &Step) -> Vec<NodeId> {
    let (children, descendants_or_self): (Vec<NodeId>, Vec<NodeId>) = match ctx {
        None => {
            let root = doc.root();
            let all = std::iter::once(root).chain(doc.descendants(root)).collect();
            (vec![root], all)
        }
        Some(n) => (
            doc.children(n).to_vec(),
            std::iter::once(n).chain(doc.descendants(n)).collect(),
        ),
    };

    match &step.test {
        NodeTest::SelfNode => match step.axis {
            Axis::Child => ctx.into_iter().collect(),
            Axis::Descendant => descendants_or_self,
        },
        NodeTest::Parent => {
            let base: Vec<NodeId> = match step.axis {
                Axis::Child => ctx.into_iter().collect(),
                Axis::Descendant => descendants_or_self,
            };
            base.into_iter().filter_map(|n| doc.parent(n)).collect()
        }
        test => {
            let pool = match step.axis {
                Axis::Child => children,
                Axis::Descendant => match ctx {
                    // `//x` from the virtual node includes the root itself
                    None => descendants_or_self,
                    Some(n) => doc.descendants(n),
                },
            };
            pool.into_iter()
                .filter(|&n| match test {
                    NodeTest::Name(name) => doc.kind(n).name() == name,
                    _ => true,
                })
                .collect()
        }
    }
}

fn matches_predicates(doc: &LayoutDocument, node: NodeId, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| match p {
        Predicate::Has(name) => doc.attr(node, name).is_some(),
        Predicate::Equals(name, value) => doc.attr(node, name) == Some(value.as_str()),
    })
}

impl LayoutDocument {
    /// Selects nodes with a path relative to `base` (or the root).
    pub fn select(&self, path: &str, base: Option<NodeId>) -> Result<Vec<NodeId>> {
        Selector::parse(path)?.evaluate(self, base)
    }

    /// First node matched by a path.
    pub fn select_one(&self, path: &str, base: Option<NodeId>) -> Result<Option<NodeId>> {
        Ok(self.select(path, base)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predicates_with_slashes_in_values() {
        let sel = Selector::parse("//TextLine[@id='a/b']/Coords").unwrap();
        assert!(sel.absolute);
        assert_eq!(sel.steps.len(), 2);
        assert_eq!(sel.steps[0].axis, Axis::Descendant);
        assert_eq!(
            sel.steps[0].predicates,
            vec![Predicate::Equals("id".into(), "a/b".into())]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "a//", "TextLine[@id", "TextLine[id='x']", "a///b", "x[@id=y]"] {
            assert!(Selector::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
