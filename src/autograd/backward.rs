//! Backward operation trait

/// A node in the gradient tape.
///
/// Implementations read the gradient of their output, accumulate the
/// corresponding gradients into their inputs and recurse into the inputs'
/// own backward ops.
pub trait BackwardOp {
    fn backward(&self);
}
