//! Domain models for stack-deploy
//!
//! Contains the resolution engine without any I/O concerns.

mod id;
mod stack;
mod registry;
mod resolver;
mod exclusion;
mod graph;
mod plan;

pub use id::{IdError, Node, Reference, StackId, ROOT_NODE_NAME, STACK_TAG_PREFIX};
pub use stack::{Stack, StackRecord};
pub use registry::{Registry, RegistryError, RegistryOptions};
pub use resolver::{dependency_nodes, resolve, targets_only, Edge, Resolution};
pub use exclusion::{omit, prune, pruned_nodes, Selection, SelectionRequest};
pub use graph::{find_cycles, run_order, GraphExport, GraphNode, NodeStatus};
pub use plan::{
    plan, tag_selector, ExecutionPlan, Invocation, PlanOptions, RunCommand, Step, StepKind, Tools,
};
