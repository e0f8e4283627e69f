pub mod context_graph;
pub mod distractions;
pub mod objectives;
