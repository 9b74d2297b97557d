use std::fmt;

/// Error types of the collocation solver.
///
/// A solve that does not converge is NOT an error: it is reported through
/// `CollocationResult::success == false` together with the solver diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum CollocationError {
    /// model, parameters, degrees, domain or task file failed validation
    Configuration(String),
    /// an array does not have the size implied by the degree specification
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    /// an expression could not be turned into a numeric function
    Compilation(String),
    /// linear algebra failure that is not a convergence failure
    Numerical(String),
    Io(String),
}

impl CollocationError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        CollocationError::Configuration(msg.into())
    }

    pub fn shape<S: Into<String>>(context: S, expected: usize, found: usize) -> Self {
        CollocationError::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

impl fmt::Display for CollocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CollocationError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            CollocationError::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "Shape mismatch in {}: expected {} elements, found {}",
                context, expected, found
            ),
            CollocationError::Compilation(msg) => write!(f, "Compilation error: {}", msg),
            CollocationError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
            CollocationError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for CollocationError {}

impl From<std::io::Error> for CollocationError {
    fn from(e: std::io::Error) -> Self {
        CollocationError::Io(e.to_string())
    }
}

impl From<csv::Error> for CollocationError {
    fn from(e: csv::Error) -> Self {
        CollocationError::Io(e.to_string())
    }
}
