//! Branch-condition trees and root-to-leaf path enumeration.
//!
//! The extraction tool serializes a program's branch structure as
//! `Condition "(" true-subtree ")" "(" false-subtree ")"`, recursively, with
//! the empty string (or the explicit `","` marker) as a leaf. Parsing is
//! recursive descent carrying the input position through arguments and
//! return values, so it is reentrant and testable in isolation.

use crate::errors::TreeError;

/// One branch point in a program's condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondTree {
    /// End of a path.
    Leaf,
    Branch {
        condition: String,
        on_true: Box<CondTree>,
        on_false: Box<CondTree>,
    },
}

/// One step of a root-to-leaf path: a condition id and the branch taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub condition: String,
    pub taken: bool,
}

/// An ordered root-to-leaf walk of a condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    pub steps: Vec<PathStep>,
}

impl CondTree {
    /// Parse tree text per the extraction tool's grammar.
    pub fn parse(source: &str) -> Result<CondTree, TreeError> {
        let trimmed = source.trim();
        let (tree, end) = parse_node(trimmed, 0)?;
        if end != trimmed.len() {
            return Err(TreeError::malformed(
                "trailing input after tree",
                end,
                trimmed.len(),
                trimmed,
            ));
        }
        Ok(tree)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, CondTree::Leaf)
    }

    /// Enumerate every root-to-leaf path, true branch first.
    ///
    /// The iterator is finite and derives fresh on every call; traversal
    /// order matters only for deterministic output ordering.
    pub fn paths(&self) -> Paths<'_> {
        Paths {
            stack: vec![(self, Vec::new())],
        }
    }
}

/// Iterator over the root-to-leaf paths of a [`CondTree`].
pub struct Paths<'a> {
    stack: Vec<(&'a CondTree, Vec<PathStep>)>,
}

impl Iterator for Paths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some((node, prefix)) = self.stack.pop() {
            match node {
                CondTree::Leaf => return Some(Path { steps: prefix }),
                CondTree::Branch {
                    condition,
                    on_true,
                    on_false,
                } => {
                    let mut false_prefix = prefix.clone();
                    false_prefix.push(PathStep {
                        condition: condition.clone(),
                        taken: false,
                    });
                    let mut true_prefix = prefix;
                    true_prefix.push(PathStep {
                        condition: condition.clone(),
                        taken: true,
                    });
                    // LIFO stack: push the false branch first so the true
                    // branch is emitted first.
                    self.stack.push((on_false, false_prefix));
                    self.stack.push((on_true, true_prefix));
                }
            }
        }
        None
    }
}

/// Parse one subtree starting at `pos`, returning the node and the position
/// just past it. Does not consume the parent's closing parenthesis.
fn parse_node(src: &str, pos: usize) -> Result<(CondTree, usize), TreeError> {
    let bytes = src.as_bytes();
    let mut i = pos;
    while i < bytes.len() && bytes[i] != b'(' && bytes[i] != b')' {
        i += 1;
    }
    let text = &src[pos..i];

    if i == bytes.len() || bytes[i] == b')' {
        // No children within this extent: must be a leaf marker.
        return if text.is_empty() || text == "," {
            Ok((CondTree::Leaf, i))
        } else {
            Err(TreeError::malformed(
                format!("condition '{text}' is missing its two children"),
                pos,
                i,
                src,
            ))
        };
    }

    // bytes[i] == b'(' — this is a branch node.
    if text.is_empty() {
        return Err(TreeError::malformed(
            "branch node has an empty condition",
            pos,
            i + 1,
            src,
        ));
    }
    let condition = text.to_string();

    let (on_true, j) = parse_node(src, i + 1)?;
    let j = expect(src, j, b')', "unbalanced parenthesis after true branch")?;
    if j >= bytes.len() || bytes[j] != b'(' {
        return Err(TreeError::malformed(
            format!("condition '{condition}' is missing its false branch"),
            j.min(src.len().saturating_sub(1)),
            src.len(),
            src,
        ));
    }
    let (on_false, k) = parse_node(src, j + 1)?;
    let k = expect(src, k, b')', "unbalanced parenthesis after false branch")?;

    Ok((
        CondTree::Branch {
            condition,
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        },
        k,
    ))
}

fn expect(src: &str, pos: usize, byte: u8, message: &str) -> Result<usize, TreeError> {
    if src.as_bytes().get(pos) == Some(&byte) {
        Ok(pos + 1)
    } else {
        Err(TreeError::malformed(
            message,
            pos.min(src.len().saturating_sub(1)),
            src.len(),
            src,
        ))
    }
}

impl std::fmt::Display for CondTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CondTree::Leaf => Ok(()),
            CondTree::Branch {
                condition,
                on_true,
                on_false,
            } => write!(f, "{condition}({on_true})({on_false})"),
        }
    }
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.condition, self.taken)
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "(empty path)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
