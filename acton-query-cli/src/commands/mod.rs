pub mod config;
pub mod products;
pub mod tree;

/// How a successful command ended
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The requested item does not exist; carries the message to print
    NotFound(String),
}
