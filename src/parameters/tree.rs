//! Parameter trees
//!
//! The tunable parameter space is a tree of AND, value and OR nodes. AND
//! nodes group children, value nodes hold one parameter with at most one
//! child, and OR nodes hold one categorical parameter whose value selects
//! which child subtree is active.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::genome::genome::Genome;
use crate::parameters::allele::Allele;
use crate::parameters::domain::Domain;

/// One child subtree of an OR node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrBranch {
    /// Categorical value activating this branch
    pub value: Allele,
    /// Subtree active for that value
    pub node: ParameterNode,
}

/// A node of the parameter tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterNode {
    /// Pure grouping node without a value
    And {
        #[serde(default)]
        children: Vec<ParameterNode>,
    },
    /// A single parameter
    Value {
        identifier: String,
        domain: Domain,
        #[serde(default)]
        child: Option<Box<ParameterNode>>,
    },
    /// A categorical parameter selecting one subtree per value
    Or {
        identifier: String,
        domain: Domain,
        #[serde(default)]
        branches: Vec<OrBranch>,
    },
}

impl ParameterNode {
    /// Create an AND node
    pub fn and(children: Vec<ParameterNode>) -> Self {
        Self::And { children }
    }

    /// Create a value node without child
    pub fn value(identifier: impl Into<String>, domain: Domain) -> Self {
        Self::Value {
            identifier: identifier.into(),
            domain,
            child: None,
        }
    }

    /// Create a value node with a child
    pub fn value_with_child(
        identifier: impl Into<String>,
        domain: Domain,
        child: ParameterNode,
    ) -> Self {
        Self::Value {
            identifier: identifier.into(),
            domain,
            child: Some(Box::new(child)),
        }
    }

    /// Create an OR node
    pub fn or(identifier: impl Into<String>, domain: Domain, branches: Vec<OrBranch>) -> Self {
        Self::Or {
            identifier: identifier.into(),
            domain,
            branches,
        }
    }

    /// Identifier and domain of the parameter this node holds, if any
    pub fn parameter(&self) -> Option<(&str, &Domain)> {
        match self {
            Self::And { .. } => None,
            Self::Value {
                identifier, domain, ..
            }
            | Self::Or {
                identifier, domain, ..
            } => Some((identifier.as_str(), domain)),
        }
    }

    /// Direct children of this node
    pub fn children(&self) -> Vec<&ParameterNode> {
        match self {
            Self::And { children } => children.iter().collect(),
            Self::Value { child, .. } => child.iter().map(|c| c.as_ref()).collect(),
            Self::Or { branches, .. } => branches.iter().map(|b| &b.node).collect(),
        }
    }
}

/// Immutable tree of all tunable parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterTree {
    root: ParameterNode,
    domains: BTreeMap<String, Domain>,
}

impl ParameterTree {
    /// Build a tree, checking identifiers, domains and OR nodes
    pub fn new(root: ParameterNode) -> Result<Self, ParameterError> {
        let mut domains = BTreeMap::new();
        let mut stack = vec![&root];

        while let Some(node) = stack.pop() {
            if let ParameterNode::Or {
                identifier,
                domain,
                branches,
            } = node
            {
                if !domain.is_categorical() {
                    return Err(ParameterError::InvalidOrNode {
                        identifier: identifier.clone(),
                        reason: "domain must be categorical".to_string(),
                    });
                }
                for branch in branches {
                    if !domain.contains(&branch.value) {
                        return Err(ParameterError::InvalidOrNode {
                            identifier: identifier.clone(),
                            reason: format!("branch value {} not in domain", branch.value),
                        });
                    }
                }
            }

            if let Some((identifier, domain)) = node.parameter() {
                domain.validate()?;
                if domains
                    .insert(identifier.to_string(), domain.clone())
                    .is_some()
                {
                    return Err(ParameterError::DuplicateIdentifier(identifier.to_string()));
                }
            }

            stack.extend(node.children());
        }

        Ok(Self { root, domains })
    }

    /// Parse a JSON tree specification
    pub fn from_json(json: &str) -> Result<Self, ParameterError> {
        let root: ParameterNode = serde_json::from_str(json)
            .map_err(|e| ParameterError::Specification(e.to_string()))?;
        Self::new(root)
    }

    /// Read a JSON tree specification
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ParameterError> {
        let root: ParameterNode = serde_json::from_reader(reader)
            .map_err(|e| ParameterError::Specification(e.to_string()))?;
        Self::new(root)
    }

    /// Root node
    pub fn root(&self) -> &ParameterNode {
        &self.root
    }

    /// All parameters, sorted by identifier
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Domain)> {
        self.domains.iter().map(|(id, d)| (id.as_str(), d))
    }

    /// All identifiers in lexicographic order
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.domains.len()
    }

    /// Domain of a parameter
    pub fn domain(&self, identifier: &str) -> Result<&Domain, ParameterError> {
        self.domains
            .get(identifier)
            .ok_or_else(|| ParameterError::UnknownIdentifier(identifier.to_string()))
    }

    /// Identifiers active for a genome, i.e. not hidden below an inactive OR branch
    pub fn active_identifiers(&self, genome: &Genome) -> Vec<&str> {
        let mut active = Vec::new();
        let mut stack = vec![&self.root];

        while let Some(node) = stack.pop() {
            match node {
                ParameterNode::And { children } => stack.extend(children.iter()),
                ParameterNode::Value {
                    identifier, child, ..
                } => {
                    active.push(identifier.as_str());
                    if let Some(child) = child {
                        stack.push(child);
                    }
                }
                ParameterNode::Or {
                    identifier,
                    branches,
                    ..
                } => {
                    active.push(identifier.as_str());
                    if let Some(value) = genome.gene_value(identifier) {
                        stack.extend(
                            branches
                                .iter()
                                .filter(|b| &b.value == value)
                                .map(|b| &b.node),
                        );
                    }
                }
            }
        }

        active.sort_unstable();
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver_tree() -> ParameterTree {
        ParameterTree::new(ParameterNode::and(vec![
            ParameterNode::value("alpha", Domain::continuous(0.0, 1.0).unwrap()),
            ParameterNode::or(
                "method",
                Domain::categorical(["cg", "gmres"]).unwrap(),
                vec![
                    OrBranch {
                        value: Allele::from("cg"),
                        node: ParameterNode::value("cg_iter", Domain::integer(1, 100).unwrap()),
                    },
                    OrBranch {
                        value: Allele::from("gmres"),
                        node: ParameterNode::value("restart", Domain::integer(5, 50).unwrap()),
                    },
                ],
            ),
        ]))
        .unwrap()
    }

    #[test]
    fn test_identifiers_are_sorted() {
        let tree = solver_tree();
        let ids: Vec<&str> = tree.identifiers().collect();
        assert_eq!(ids, vec!["alpha", "cg_iter", "method", "restart"]);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let result = ParameterTree::new(ParameterNode::and(vec![
            ParameterNode::value("a", Domain::integer(0, 1).unwrap()),
            ParameterNode::value("a", Domain::integer(0, 1).unwrap()),
        ]));
        assert_eq!(
            result.unwrap_err(),
            ParameterError::DuplicateIdentifier("a".to_string())
        );
    }

    #[test]
    fn test_or_node_needs_categorical_domain() {
        let result = ParameterTree::new(ParameterNode::or(
            "a",
            Domain::integer(0, 1).unwrap(),
            vec![],
        ));
        assert!(matches!(result, Err(ParameterError::InvalidOrNode { .. })));
    }

    #[test]
    fn test_active_identifiers_follow_or_branch() {
        let tree = solver_tree();
        let mut genome = Genome::new(0);
        genome.set_gene("alpha", Allele::Float(0.5));
        genome.set_gene("method", Allele::from("gmres"));
        genome.set_gene("cg_iter", Allele::Int(3));
        genome.set_gene("restart", Allele::Int(10));

        assert_eq!(
            tree.active_identifiers(&genome),
            vec!["alpha", "method", "restart"]
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "type": "and",
            "children": [
                {"type": "value", "identifier": "x", "domain": {"kind": "log", "min": 1.0, "max": 16.0}},
                {"type": "or", "identifier": "mode", "domain": {"kind": "categorical", "values": ["a", "b"]},
                 "branches": [{"value": "a", "node": {"type": "value", "identifier": "y",
                               "domain": {"kind": "integer", "min": 0, "max": 3}}}]}
            ]
        }"#;
        let tree = ParameterTree::from_json(json).unwrap();
        assert_eq!(tree.parameter_count(), 3);
        assert!(tree.domain("x").unwrap().is_log_scaled());
        assert!(tree.domain("missing").is_err());
    }
}
