//! State diagram parser for workflow definitions
//!
//! Parses a Mermaid `stateDiagram-v2` style notation into a
//! [`WorkflowDefinition`]: plain node and `<<choice>>` declarations, labeled
//! and unlabeled arrows, `[*]` start and terminal markers, and notes attached
//! to nodes that may carry an embedded action descriptor.

use crate::actions::ActionDescriptor;
use crate::definition::{DefinitionError, WorkflowDefinition, WorkflowId, WorkflowName};
use crate::node::{NodeId, NodeKind, WorkflowNode};
use crate::transition::Transition;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while parsing diagram text
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input contained no node declarations or arrows
    #[error("Diagram declares no nodes")]
    EmptyDiagram,

    /// A line did not match any recognized construct
    #[error("Syntax error on line {line}: '{text}'")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// The offending line text
        text: String,
    },

    /// The same node ID was declared explicitly more than once
    #[error("Duplicate node declaration on line {line}: '{id}'")]
    DuplicateDeclaration {
        /// 1-based line number
        line: usize,
        /// The node ID declared twice
        id: String,
    },

    /// A note was attached to a node that never appears in the diagram
    #[error("Note attached to unknown node: '{id}'")]
    UnknownNoteTarget {
        /// The missing node ID
        id: String,
    },

    /// A note block was opened but never closed with `end note`
    #[error("Unterminated note block starting on line {line}")]
    UnterminatedNote {
        /// 1-based line number of the `note` line
        line: usize,
    },

    /// No start marker and no node without incoming edges
    #[error("Diagram has no start point: declare '[*] --> <node>' or leave one node without incoming edges")]
    NoStartPoint,

    /// The parsed graph violates a structural invariant
    #[error("Invalid workflow structure: {0}")]
    Structure(#[from] DefinitionError),
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

const START_MARKER: &str = "[*]";

struct RawNode {
    id: String,
    label: String,
    decision: bool,
    explicit: bool,
}

struct RawEdge {
    from: String,
    to: String,
    label: Option<String>,
}

/// Parser for state diagram workflow descriptions
pub struct DiagramParser {
    state_re: Regex,
    arrow_re: Regex,
    note_line_re: Regex,
    note_block_re: Regex,
}

impl DiagramParser {
    /// Create a parser with compiled patterns
    pub fn new() -> Self {
        Self {
            state_re: Regex::new(
                r#"^state\s+(?:"([^"]*)"\s+as\s+)?([A-Za-z0-9_.-]+)(\s*<<choice>>)?\s*$"#,
            )
            .expect("state pattern is valid"),
            arrow_re: Regex::new(
                r"^(\[\*\]|[A-Za-z0-9_.-]+)\s*-->\s*(\[\*\]|[A-Za-z0-9_.-]+)\s*(?::\s*(.+?))?\s*$",
            )
            .expect("arrow pattern is valid"),
            note_line_re: Regex::new(
                r"^note\s+(?:right|left)\s+of\s+([A-Za-z0-9_.-]+)\s*:\s*(.+)$",
            )
            .expect("note line pattern is valid"),
            note_block_re: Regex::new(r"^note\s+(?:right|left)\s+of\s+([A-Za-z0-9_.-]+)\s*$")
                .expect("note block pattern is valid"),
        }
    }

    /// Parse diagram text into a validated workflow definition
    ///
    /// Import is all-or-nothing: any syntax or structural error fails the
    /// whole parse. A note whose embedded action descriptor is malformed JSON
    /// does not fail the import; the node keeps the raw text as its
    /// annotation and no metadata.
    pub fn parse(
        &self,
        input: &str,
        id: impl Into<WorkflowId>,
        name: impl Into<WorkflowName>,
    ) -> ParseResult<WorkflowDefinition> {
        let mut nodes: Vec<RawNode> = Vec::new();
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut edges: Vec<RawEdge> = Vec::new();
        let mut starts: Vec<String> = Vec::new();
        let mut notes: HashMap<String, String> = HashMap::new();

        let mut lines = input.lines().enumerate();
        while let Some((line_idx, raw_line)) = lines.next() {
            let line_no = line_idx + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() || is_ignored_keyword(line) {
                continue;
            }

            if let Some(caps) = self.state_re.captures(line) {
                let id = caps.get(2).map(|m| m.as_str().to_string()).unwrap();
                let label = caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| id.clone());
                let decision = caps.get(3).is_some();
                declare_node(
                    &mut nodes,
                    &mut order,
                    RawNode {
                        id,
                        label,
                        decision,
                        explicit: true,
                    },
                    line_no,
                )?;
                continue;
            }

            if let Some(caps) = self.arrow_re.captures(line) {
                let from = caps.get(1).unwrap().as_str().to_string();
                let to = caps.get(2).unwrap().as_str().to_string();
                let label = caps.get(3).map(|m| m.as_str().to_string());

                match (from.as_str(), to.as_str()) {
                    (START_MARKER, START_MARKER) => {}
                    (START_MARKER, _) => {
                        reference_node(&mut nodes, &mut order, &to);
                        if !starts.contains(&to) {
                            starts.push(to);
                        }
                    }
                    (_, START_MARKER) => {
                        // Terminal marker: the node simply has no edge here
                        reference_node(&mut nodes, &mut order, &from);
                    }
                    _ => {
                        reference_node(&mut nodes, &mut order, &from);
                        reference_node(&mut nodes, &mut order, &to);
                        edges.push(RawEdge { from, to, label });
                    }
                }
                continue;
            }

            if let Some(caps) = self.note_line_re.captures(line) {
                let target = caps.get(1).unwrap().as_str().to_string();
                let text = caps.get(2).unwrap().as_str().to_string();
                notes.insert(target, text);
                continue;
            }

            if let Some(caps) = self.note_block_re.captures(line) {
                let target = caps.get(1).unwrap().as_str().to_string();
                let mut body: Vec<String> = Vec::new();
                let mut closed = false;
                for (_, block_line) in lines.by_ref() {
                    let trimmed = strip_comment(block_line).trim().to_string();
                    if trimmed == "end note" {
                        closed = true;
                        break;
                    }
                    body.push(trimmed);
                }
                if !closed {
                    return Err(ParseError::UnterminatedNote { line: line_no });
                }
                notes.insert(target, body.join("\n"));
                continue;
            }

            return Err(ParseError::Syntax {
                line: line_no,
                text: line.to_string(),
            });
        }

        if nodes.is_empty() {
            return Err(ParseError::EmptyDiagram);
        }

        for target in notes.keys() {
            if !order.contains_key(target) {
                return Err(ParseError::UnknownNoteTarget { id: target.clone() });
            }
        }

        // No explicit start marker: the first node with no incoming edges
        if starts.is_empty() {
            let fallback = nodes
                .iter()
                .find(|n| !edges.iter().any(|e| e.to == n.id))
                .map(|n| n.id.clone());
            match fallback {
                Some(id) => starts.push(id),
                None => return Err(ParseError::NoStartPoint),
            }
        }

        let workflow_nodes: Vec<WorkflowNode> = nodes
            .iter()
            .map(|raw| {
                let annotation = notes.get(&raw.id).cloned();
                let metadata = annotation
                    .as_deref()
                    .and_then(|text| serde_json::from_str::<ActionDescriptor>(text.trim()).ok());
                WorkflowNode {
                    id: NodeId::new(&raw.id),
                    label: raw.label.clone(),
                    kind: if raw.decision {
                        NodeKind::Decision
                    } else {
                        NodeKind::Task
                    },
                    annotation,
                    metadata,
                }
            })
            .collect();

        // A label only becomes a choice condition on edges leaving a decision
        let transitions: Vec<Transition> = edges
            .into_iter()
            .map(|edge| {
                let from_decision = order
                    .get(&edge.from)
                    .map(|idx| nodes[*idx].decision)
                    .unwrap_or(false);
                Transition {
                    from: NodeId::new(edge.from),
                    to: NodeId::new(edge.to),
                    condition: if from_decision { edge.label } else { None },
                }
            })
            .collect();

        let start_points = starts.into_iter().map(NodeId::new).collect();

        Ok(WorkflowDefinition::new(
            id.into(),
            name.into(),
            workflow_nodes,
            transitions,
            start_points,
        )?)
    }
}

impl Default for DiagramParser {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn is_ignored_keyword(line: &str) -> bool {
    line.starts_with("stateDiagram") || line.starts_with("direction ")
}

fn declare_node(
    nodes: &mut Vec<RawNode>,
    order: &mut HashMap<String, usize>,
    node: RawNode,
    line_no: usize,
) -> ParseResult<()> {
    if let Some(idx) = order.get(&node.id) {
        let existing = &mut nodes[*idx];
        if existing.explicit {
            return Err(ParseError::DuplicateDeclaration {
                line: line_no,
                id: node.id,
            });
        }
        // Upgrade an auto-declared node with the explicit label and kind
        existing.label = node.label;
        existing.decision = existing.decision || node.decision;
        existing.explicit = true;
        return Ok(());
    }
    order.insert(node.id.clone(), nodes.len());
    nodes.push(node);
    Ok(())
}

fn reference_node(nodes: &mut Vec<RawNode>, order: &mut HashMap<String, usize>, id: &str) {
    if !order.contains_key(id) {
        order.insert(id.to_string(), nodes.len());
        nodes.push(RawNode {
            id: id.to_string(),
            label: id.to_string(),
            decision: false,
            explicit: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(input: &str) -> ParseResult<WorkflowDefinition> {
        DiagramParser::new().parse(input, WorkflowId::new("wf-test"), "test")
    }

    #[test]
    fn test_parse_simple_diagram() {
        let input = r#"
        stateDiagram-v2
            [*] --> A
            A --> B
            B --> C
            C --> [*]
        "#;

        let definition = parse(input).unwrap();
        assert_eq!(definition.nodes().len(), 3);
        assert_eq!(definition.transitions().len(), 2);
        assert_eq!(definition.primary_start().as_str(), "A");
        assert!(definition.is_terminal(&NodeId::new("C")));
    }

    #[test]
    fn test_parse_labels_preserved_verbatim() {
        let input = r#"
            state "Welcome Visitor" as welcome
            [*] --> welcome
        "#;

        let definition = parse(input).unwrap();
        let node = definition.node(&NodeId::new("welcome")).unwrap();
        assert_eq!(node.label, "Welcome Visitor");
        // Matching elsewhere is case-insensitive by convention
        assert!(definition.node_by_label("welcome visitor").is_some());
    }

    #[test]
    fn test_parse_decision_node_with_choices() {
        let input = r#"
            state route <<choice>>
            [*] --> route
            route --> tour: yes
            route --> exit: no
        "#;

        let definition = parse(input).unwrap();
        let route = NodeId::new("route");
        assert_eq!(
            definition.node(&route).unwrap().kind,
            NodeKind::Decision
        );
        let choices = definition.choices_from(&route);
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].condition.as_deref(), Some("yes"));
        assert_eq!(choices[0].to.as_str(), "tour");
        assert_eq!(choices[1].condition.as_deref(), Some("no"));
        assert_eq!(choices[1].to.as_str(), "exit");
    }

    #[test]
    fn test_label_on_task_edge_is_not_a_condition() {
        let input = r#"
            [*] --> A
            A --> B: just documentation
        "#;

        let definition = parse(input).unwrap();
        assert!(!definition.is_choice(&NodeId::new("A")));
        assert_eq!(
            definition
                .auto_advance_target(&NodeId::new("A"))
                .unwrap()
                .as_str(),
            "B"
        );
    }

    #[test]
    fn test_note_with_action_descriptor() {
        let input = r#"
            [*] --> probe
            probe --> done
            note right of probe: {"action": "locate", "params": {"radius": "50"}}
        "#;

        let definition = parse(input).unwrap();
        let node = definition.node(&NodeId::new("probe")).unwrap();
        assert!(node.annotation.is_some());
        let descriptor = node.metadata.as_ref().unwrap();
        assert_eq!(descriptor.name, "locate");
        assert_eq!(descriptor.params.get("radius").map(String::as_str), Some("50"));
    }

    #[test]
    fn test_note_block_form() {
        let input = r#"
            [*] --> probe
            note right of probe
                {"action": "locate",
                 "params": {"radius": "50"}}
            end note
        "#;

        let definition = parse(input).unwrap();
        let node = definition.node(&NodeId::new("probe")).unwrap();
        assert_eq!(node.metadata.as_ref().unwrap().name, "locate");
    }

    #[test]
    fn test_malformed_note_json_keeps_annotation_only() {
        let input = r#"
            [*] --> probe
            note right of probe: {"action": "locate", broken
        "#;

        let definition = parse(input).unwrap();
        let node = definition.node(&NodeId::new("probe")).unwrap();
        assert!(node.metadata.is_none());
        assert_eq!(
            node.annotation.as_deref(),
            Some(r#"{"action": "locate", broken"#)
        );
    }

    #[test]
    fn test_plain_text_note_is_not_metadata() {
        let input = r#"
            [*] --> greet
            note left of greet: remind the visitor to check in
        "#;

        let definition = parse(input).unwrap();
        let node = definition.node(&NodeId::new("greet")).unwrap();
        assert!(node.metadata.is_none());
        assert_eq!(
            node.annotation.as_deref(),
            Some("remind the visitor to check in")
        );
    }

    #[test]
    fn test_note_for_unknown_node_fails() {
        let input = r#"
            [*] --> A
            note right of ghost: hello
        "#;

        assert!(matches!(
            parse(input),
            Err(ParseError::UnknownNoteTarget { .. })
        ));
    }

    #[test]
    fn test_unterminated_note_block_fails() {
        let input = r#"
            [*] --> A
            note right of A
                dangling text
        "#;

        assert!(matches!(parse(input), Err(ParseError::UnterminatedNote { .. })));
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        let input = r#"
            state "First" as a
            state "Second" as a
            [*] --> a
        "#;

        assert!(matches!(
            parse(input),
            Err(ParseError::DuplicateDeclaration { .. })
        ));
    }

    #[test]
    fn test_start_falls_back_to_node_without_incoming_edges() {
        let input = r#"
            A --> B
            B --> C
        "#;

        let definition = parse(input).unwrap();
        assert_eq!(definition.primary_start().as_str(), "A");
    }

    #[test]
    fn test_pure_cycle_without_start_marker_fails() {
        let input = r#"
            A --> B
            B --> A
        "#;

        assert!(matches!(parse(input), Err(ParseError::NoStartPoint)));
    }

    #[test]
    fn test_first_declared_start_is_authoritative() {
        let input = r#"
            [*] --> B
            [*] --> A
            A --> B
        "#;

        let definition = parse(input).unwrap();
        assert_eq!(definition.start_points().len(), 2);
        assert_eq!(definition.primary_start().as_str(), "B");
    }

    #[test]
    fn test_ambiguous_auto_advance_is_a_parse_error() {
        let input = r#"
            [*] --> A
            A --> B
            A --> C
        "#;

        assert!(matches!(parse(input), Err(ParseError::Structure(_))));
    }

    #[test]
    fn test_unrecognized_line_fails_with_location() {
        let input = "A --> B\nthis is not a diagram line\n";

        match parse(input) {
            Err(ParseError::Syntax { line, text }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "this is not a diagram line");
            }
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(parse(""), Err(ParseError::EmptyDiagram)));
        assert!(matches!(
            parse("stateDiagram-v2\n"),
            Err(ParseError::EmptyDiagram)
        ));
    }

    #[test]
    fn test_comments_are_stripped() {
        let input = r#"
            %% the whole flow
            [*] --> A  %% entry
            A --> B
        "#;

        let definition = parse(input).unwrap();
        assert_eq!(definition.nodes().len(), 2);
    }

    proptest! {
        /// Every transition endpoint and start point of a parsed definition
        /// must reference a declared node.
        #[test]
        fn prop_parse_round_trip_references(
            names in proptest::collection::hash_set("[a-z][a-z0-9]{0,6}", 2..8),
            extra_edges in proptest::collection::vec((0usize..8, 0usize..8), 0..6),
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let mut input = String::from("stateDiagram-v2\n");
            input.push_str(&format!("[*] --> {}\n", names[0]));
            for pair in names.windows(2) {
                input.push_str(&format!("{} --> {}\n", pair[0], pair[1]));
            }
            // Extra labeled edges between random declared nodes; labels on
            // task edges are ignored so they cannot create ambiguity
            for (a, b) in extra_edges {
                let from = &names[a % names.len()];
                let to = &names[b % names.len()];
                input.push_str(&format!("{from} --> {to}: hop\n"));
            }

            let parser = DiagramParser::new();
            if let Ok(definition) = parser.parse(&input, WorkflowId::new("wf-prop"), "prop") {
                for transition in definition.transitions() {
                    prop_assert!(definition.node(&transition.from).is_some());
                    prop_assert!(definition.node(&transition.to).is_some());
                }
                for start in definition.start_points() {
                    prop_assert!(definition.node(start).is_some());
                }
            }
        }
    }
}
