//! Logic-flow graph extraction and DOT emission.
//!
//! The extractor lifts a parsed CALC program back into a flow chart: runs of
//! sequentially executed steps coalesce into a single box, conditional
//! branches become diamonds with `true`/`false` edges, and every termination
//! instruction merges into one synthetic `End` node. Branches that target a
//! termination step are rewired onto the synthetic end.

use std::{collections::BTreeMap, fmt};

use itertools::Itertools;

use super::{
    error::GraphingError,
    opcode::Opcode,
    operand::{one_operand, Operand},
    Step,
};

/// Key of the synthetic `End` node, one past the last real step.
pub(crate) const END_STEP_NUMBER: usize = 51;

/// A node of the extracted flow graph, keyed by its first step number.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    /// Synthetic entry node, at key 0.
    Start,
    /// Synthetic exit node, at key [`END_STEP_NUMBER`].
    End,
    /// One or more sequentially executed steps.
    Group(Vec<Step>),
    /// A conditional branch with its rewritten target.
    Conditional { test: Opcode, target: usize },
    /// An unconditional branch with its rewritten target.
    Goto { target: usize },
}

/// A directed edge between node keys.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    src: usize,
    dst: usize,
    label: &'static str,
}

/// The extracted graph, ready for DOT serialisation via [`fmt::Display`].
struct Graph {
    name: String,
    nodes: Vec<(usize, Node)>,
    edges: Vec<Edge>,
}

/// Extract the flow graph of `program` and serialise it as DOT text.
pub(crate) fn generate_dot(
    compound: &str,
    name: &str,
    program: &[Option<Step>],
) -> Result<String, GraphingError> {
    let groups = parse_steps(program)?;
    let mut graph = Graph {
        name: format!("{compound}__{name}__calc"),
        nodes: vec![(0, Node::Start), (END_STEP_NUMBER, Node::End)],
        edges: Vec::new(),
    };

    for ((&number, node), (&next_number, next)) in groups.iter().tuple_windows() {
        match node {
            Node::Start => {}
            Node::Group(_) => graph.nodes.push((number, node.clone())),
            Node::Conditional { target, .. } => {
                graph.nodes.push((number, node.clone()));
                graph.edges.push(Edge {
                    src: number,
                    dst: *target,
                    label: "true",
                });
                graph.edges.push(Edge {
                    src: number,
                    dst: next_number,
                    label: "false",
                });
                continue;
            }
            Node::Goto { .. } | Node::End => continue,
        }

        // Forward edge out of a group (or the start node): straight to the
        // next group, except through a goto or into the merged end.
        let edge = match next {
            Node::Goto { target } => Edge {
                src: number,
                dst: *target,
                label: "",
            },
            Node::End => Edge {
                src: number,
                dst: END_STEP_NUMBER,
                label: "",
            },
            _ => Edge {
                src: number,
                dst: next_number,
                label: "",
            },
        };
        graph.edges.push(edge);
    }

    Ok(graph.to_string())
}

/// Sort steps into sequential execution groups.
///
/// The iteration consumes a work copy of the step table; branch targets are
/// split into their own groups so they can act as join points, and branches
/// whose target terminates the program are rewritten onto the synthetic end
/// key. The original table stays available for the terminator lookup.
fn parse_steps(program: &[Option<Step>]) -> Result<BTreeMap<usize, Node>, GraphingError> {
    let steps: BTreeMap<usize, &Step> = program
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.as_ref().map(|step| (index + 1, step)))
        .collect();

    let mut stack = steps.clone();
    let mut groups: BTreeMap<usize, Node> = BTreeMap::new();
    groups.insert(0, Node::Start);
    groups.insert(END_STEP_NUMBER, Node::End);

    while let Some((number, step)) = stack.pop_first() {
        if step.opcode.is_breaking() {
            return Err(GraphingError::BreakingInstruction);
        }

        // Terminations all merge into the synthetic end node.
        if step.opcode.is_termination() {
            continue;
        }

        if step.opcode.is_branch() {
            let target = branch_target(step)?;

            // Reroute branches that would terminate to the merged end step.
            let target = match steps.get(&target) {
                Some(destination) if destination.opcode.is_termination() => END_STEP_NUMBER,
                _ => target,
            };

            // A branch destination becomes a join point: its own group.
            if target != END_STEP_NUMBER && !groups.contains_key(&target) {
                if let Some(destination) = stack.remove(&target) {
                    groups.insert(target, Node::Group(vec![destination.clone()]));
                }
            }

            let node = if step.opcode.is_conditional_branch() {
                Node::Conditional {
                    test: step.opcode,
                    target,
                }
            } else {
                Node::Goto { target }
            };
            groups.insert(number, node);
        } else {
            let mut group = vec![step.clone()];
            let mut next = number + 1;

            // Absorb the run of sequentially executed steps.
            while stack
                .get(&next)
                .is_some_and(|following| !following.opcode.is_special())
            {
                if let Some(following) = stack.remove(&next) {
                    group.push(following.clone());
                }
                next += 1;
            }

            // A run that directly follows a branch destination joins it.
            match groups.get_mut(&(number - 1)) {
                Some(Node::Group(previous)) => previous.extend(group),
                _ => {
                    groups.insert(number, Node::Group(group));
                }
            }
        }
    }

    Ok(groups)
}

/// Branch target from the step's single integer operand.
fn branch_target(step: &Step) -> Result<usize, GraphingError> {
    if !one_operand(&step.operands) {
        return Err(GraphingError::InvalidOperand);
    }
    match step.operands.first() {
        Some(Operand::Literal(target)) => {
            usize::try_from(*target).map_err(|_| GraphingError::InvalidOperand)
        }
        _ => Err(GraphingError::InvalidOperand),
    }
}

/// Diamond label of a conditional test.
fn conditional_label(test: Opcode) -> &'static str {
    match test {
        Opcode::BIF | Opcode::BIZ => "== 0?",
        Opcode::BII => "block\\ninit?",
        Opcode::BIN => "< 0?",
        Opcode::BIP => ">= 0?",
        Opcode::BIT => "!= 0?",
        _ => "?",
    }
}

/// DOT node identifier for a group key.
fn node_id(key: usize) -> String {
    match key {
        0 => "Start".to_string(),
        END_STEP_NUMBER => "End".to_string(),
        number => format!("Step {number}"),
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph \"{}\" {{", self.name)?;
        writeln!(f, "rankdir=LR;")?;
        writeln!(f, "bgcolor=transparent;")?;

        for (key, node) in &self.nodes {
            match node {
                Node::Start => writeln!(
                    f,
                    "\"Start\" [label=\"START\", shape=box, style=rounded, fontname=Arial];"
                )?,
                Node::End => writeln!(
                    f,
                    "\"End\" [label=\"END\", shape=box, style=rounded, fontname=Arial];"
                )?,
                Node::Group(steps) => {
                    let label = steps.iter().map(Step::to_string).join("\\n");
                    writeln!(
                        f,
                        "\"{}\" [label=\"{label}\", shape=box, fontname=Arial];",
                        node_id(*key)
                    )?;
                }
                Node::Conditional { test, .. } => writeln!(
                    f,
                    "\"{}\" [label=\"{}\", shape=diamond, regular=true, fixedsize=true, \
                     height=.8, width=.8, fontname=Arial];",
                    node_id(*key),
                    conditional_label(*test)
                )?,
                Node::Goto { .. } => {}
            }
        }

        for edge in &self.edges {
            if edge.label.is_empty() {
                writeln!(
                    f,
                    "\"{}\" -- \"{}\" [dir=forward, fontname=Arial];",
                    node_id(edge.src),
                    node_id(edge.dst)
                )?;
            } else {
                writeln!(
                    f,
                    "\"{}\" -- \"{}\" [label=\"{}\", dir=forward, fontname=Arial];",
                    node_id(edge.src),
                    node_id(edge.dst),
                    edge.label
                )?;
            }
        }

        writeln!(f, "}}")
    }
}
