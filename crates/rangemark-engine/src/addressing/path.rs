use std::fmt;
use std::str::FromStr;

use super::{AddressParseError, Step, nth_child};
use crate::tree::{DocumentTree, NodeId};

const TEXT_STEP: &str = "#text";

/// Sibling-index path from a root to a node, serialized as `p:2/#text:1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathAddress {
    steps: Vec<Step>,
}

impl PathAddress {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn resolve(&self, tree: &DocumentTree, root: NodeId) -> Option<NodeId> {
        self.steps.iter().try_fold(root, |current, step| match step {
            Step::Element { tag, index } => nth_child(tree, current, *index, |child| {
                tree.tag(child).is_some_and(|t| t.eq_ignore_ascii_case(tag))
            }),
            Step::Text { index } => nth_child(tree, current, *index, |child| tree.is_text(child)),
        })
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match step {
                Step::Element { tag, index } => write!(f, "{tag}:{index}")?,
                Step::Text { index } => write!(f, "{TEXT_STEP}:{index}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PathAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let steps = s
            .split('/')
            .map(|segment| parse_step(s, segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(steps))
    }
}

fn parse_step(address: &str, segment: &str) -> Result<Step, AddressParseError> {
    let malformed = || AddressParseError::MalformedStep {
        address: address.to_string(),
        step: segment.to_string(),
    };

    // Tag names may themselves contain ':' (namespaces), the index never does
    let (name, index) = segment.rsplit_once(':').ok_or_else(malformed)?;
    let index: usize = index.parse().map_err(|_| malformed())?;
    if index == 0 {
        return Err(AddressParseError::ZeroIndex {
            address: address.to_string(),
        });
    }
    if name.is_empty() {
        return Err(malformed());
    }

    Ok(if name == TEXT_STEP {
        Step::Text { index }
    } else {
        Step::Element {
            tag: name.to_string(),
            index,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_path() {
        let path: PathAddress = "div:1/svg:g:2/#text:3".parse().unwrap();
        assert_eq!(
            path.steps(),
            &[
                Step::Element {
                    tag: "div".to_string(),
                    index: 1
                },
                Step::Element {
                    tag: "svg:g".to_string(),
                    index: 2
                },
                Step::Text { index: 3 },
            ]
        );
        assert_eq!(path.to_string(), "div:1/svg:g:2/#text:3");
    }

    #[test]
    fn test_empty_path_is_root() {
        let path: PathAddress = "".parse().unwrap();
        assert!(path.steps().is_empty());
    }

    #[rstest]
    #[case("div")]
    #[case("div:x")]
    #[case("div:1//p:1")]
    #[case(":1")]
    fn test_malformed_paths(#[case] input: &str) {
        assert!(matches!(
            input.parse::<PathAddress>(),
            Err(AddressParseError::MalformedStep { .. })
        ));
    }

    #[test]
    fn test_zero_index_rejected() {
        assert_eq!(
            "p:0".parse::<PathAddress>(),
            Err(AddressParseError::ZeroIndex {
                address: "p:0".to_string()
            })
        );
    }
}
