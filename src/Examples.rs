//! examples of usage of RustedCollocation
/// two-point BVP examples solved by orthogonal collocation
pub mod collocation_examples;
