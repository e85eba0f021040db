use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::{AddressParseError, Step, nth_child};
use crate::tree::{DocumentTree, NodeId};

/// Location step of a query address.
///
/// The encoder only produces [`QueryStep::Named`] and [`QueryStep::Text`];
/// the wildcard forms are accepted when decoding addresses written by other
/// tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStep {
    /// `tag[n]`
    Named { tag: String, index: usize },
    /// `text()[n]`
    Text { index: usize },
    /// `*[n]`: n-th element child of any tag
    AnyElement { index: usize },
    /// `node()[n]`: n-th child of any kind
    AnyNode { index: usize },
}

/// XPath-style address, serialized as `/p[2]/text()[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryAddress {
    steps: Vec<QueryStep>,
}

fn step_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(text\(\))|(node\(\))|(\*)|([A-Za-z_][A-Za-z0-9_.:-]*))(?:\[([0-9]+)\])?$")
            .expect("Invalid query step regex")
    })
}

impl QueryAddress {
    pub fn new(steps: Vec<QueryStep>) -> Self {
        Self { steps }
    }

    pub(crate) fn from_steps(steps: Vec<Step>) -> Self {
        Self::new(
            steps
                .into_iter()
                .map(|step| match step {
                    Step::Element { tag, index } => QueryStep::Named { tag, index },
                    Step::Text { index } => QueryStep::Text { index },
                })
                .collect(),
        )
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub(crate) fn resolve(&self, tree: &DocumentTree, root: NodeId) -> Option<NodeId> {
        self.steps.iter().try_fold(root, |current, step| match step {
            QueryStep::Named { tag, index } => nth_child(tree, current, *index, |child| {
                tree.tag(child).is_some_and(|t| t.eq_ignore_ascii_case(tag))
            }),
            QueryStep::Text { index } => {
                nth_child(tree, current, *index, |child| tree.is_text(child))
            }
            QueryStep::AnyElement { index } => {
                nth_child(tree, current, *index, |child| tree.tag(child).is_some())
            }
            QueryStep::AnyNode { index } => nth_child(tree, current, *index, |_| true),
        })
    }
}

impl fmt::Display for QueryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, ".");
        }
        for step in &self.steps {
            match step {
                QueryStep::Named { tag, index } => write!(f, "/{tag}[{index}]")?,
                QueryStep::Text { index } => write!(f, "/text()[{index}]")?,
                QueryStep::AnyElement { index } => write!(f, "/*[{index}]")?,
                QueryStep::AnyNode { index } => write!(f, "/node()[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for QueryAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s, "." | "/" | "./") {
            return Ok(Self::default());
        }

        let body = s
            .strip_prefix("./")
            .or_else(|| s.strip_prefix('/'))
            .ok_or_else(|| AddressParseError::NotRooted(s.to_string()))?;

        let steps = body
            .split('/')
            .map(|segment| parse_step(s, segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(steps))
    }
}

fn parse_step(address: &str, segment: &str) -> Result<QueryStep, AddressParseError> {
    let malformed = || AddressParseError::MalformedStep {
        address: address.to_string(),
        step: segment.to_string(),
    };

    let captures = step_regex().captures(segment).ok_or_else(malformed)?;
    // A step without a predicate means the first match
    let index = match captures.get(5) {
        Some(m) => m.as_str().parse::<usize>().map_err(|_| malformed())?,
        None => 1,
    };
    if index == 0 {
        return Err(AddressParseError::ZeroIndex {
            address: address.to_string(),
        });
    }

    let step = if captures.get(1).is_some() {
        QueryStep::Text { index }
    } else if captures.get(2).is_some() {
        QueryStep::AnyNode { index }
    } else if captures.get(3).is_some() {
        QueryStep::AnyElement { index }
    } else {
        let tag = captures.get(4).ok_or_else(malformed)?.as_str().to_string();
        QueryStep::Named { tag, index }
    };
    Ok(step)
}
