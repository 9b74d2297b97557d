//! # Collocation task files
//!
//! A complete collocation problem (model, parameters, basis, initial guess, solver settings and
//! postprocessing) written as a plain text document and parsed by `Utils::task_parser`.
//!
//! ## Sections
//! - `model`: `independent_var`, `dependent_vars` (comma separated)
//! - `rhs`: one `variable: expression` line per dependent variable
//! - `boundary_conditions`: `lower`, `upper`; comma separated expressions that must vanish at the
//!   corresponding end of the domain, `none` for no condition
//! - `parameters`: `name: value` (optional when the model has no parameters)
//! - `basis`: `kind` (Chebyshev, Legendre, Polynomial), `degree`, `domain: a, b`, optional
//!   `mesh_points` used to fit the initial guess (default 1000)
//! - `degrees` (optional): per-variable degrees overriding `basis.degree`
//! - `initial_guess` (optional): constant guess per variable (default 1.0)
//! - `solver_settings` (optional): `ftol`, `xtol`, `gtol`, `abs_tolerance`, `max_iterations`,
//!   `max_function_evaluations`, `initial_lambda`, `decrease_factor`, `increase_factor`,
//!   `min_lambda`, `max_lambda`, `loglevel`, `log_to_file`
//! - `postprocessing` (optional): `evaluation_points` (default 1000), `save_to_csv` (file name,
//!   or `false`)
//!
//! ## Tips
//! Some common alternative section names are accepted: `solve_settings`, `solving_settings`,
//! `boundaries`, `bc`, `params`, `constants`, `postprocess`.
//! `create_template_file` writes a commented template of the heat exchanger problem.
//!
//! ```
//! use RustedCollocation::numerical::Collocation::task_parser_collocation::CollocationTask;
//! let task: CollocationTask = "
//! model
//! independent_var: x
//! dependent_vars: y
//! rhs
//! y: -k*y
//! boundary_conditions
//! lower: y - 1
//! upper: none
//! parameters
//! k: 1
//! basis
//! kind: Chebyshev
//! degree: 10
//! domain: 0, 1
//! solver_settings
//! loglevel: off
//! postprocessing
//! evaluation_points: 11
//! "
//! .parse()
//! .unwrap();
//! let report = task.run().unwrap();
//! assert!(report.result.success);
//! assert!((report.solution["y"][10] - (-1.0f64).exp()).abs() < 1e-8);
//! ```
use crate::Utils::task_parser::{DocumentMap, SectionMap, Value, parse_document_as};
use crate::numerical::Collocation::BVP_model::TwoPointBVP;
use crate::numerical::Collocation::coefficients::Degrees;
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::collocation_solver::{
    CollocationResult, CollocationSolver, fit_initial_coefficients,
};
use crate::numerical::Collocation::polynomial_basis::BasisKind;
use crate::numerical::Collocation::residuals::CollocationNodes;
use crate::numerical::Collocation::validator::{
    Domain, Params, validate_degrees, validate_domain, validate_expression_symbols,
    validate_model_document, validate_params_section,
};
use crate::numerical::Nonlinear_systems::levenberg_marquardt::LevenbergMarquardt;
use log::info;
use nalgebra::DVector;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_MESH_POINTS: usize = 1000;
const DEFAULT_EVALUATION_POINTS: usize = 1000;
const DEFAULT_GUESS: f64 = 1.0;

const SECTIONS: [&str; 9] = [
    "model",
    "rhs",
    "boundary_conditions",
    "parameters",
    "basis",
    "degrees",
    "initial_guess",
    "solver_settings",
    "postprocessing",
];

const SECTION_PSEUDONYMS: [(&str, &[&str]); 4] = [
    ("solver_settings", &["solve_settings", "solving_settings"]),
    ("boundary_conditions", &["boundaries", "bc"]),
    ("parameters", &["params", "constants"]),
    ("postprocessing", &["postprocess"]),
];

/// Validated collocation problem read from a task document.
#[derive(Debug, Clone)]
pub struct CollocationTask {
    pub model: TwoPointBVP,
    pub params: Params,
    pub kind: BasisKind,
    pub domain: Domain,
    pub degrees: Degrees,
    pub mesh_points: usize,
    /// constant initial guess of every dependent variable
    pub initial_guess: HashMap<String, f64>,
    pub nonlinear_solver: LevenbergMarquardt,
    pub loglevel: Option<String>,
    pub log_to_file: bool,
    pub evaluation_points: usize,
    pub save_to_csv: Option<PathBuf>,
}

/// What `CollocationTask::run` produces.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub result: CollocationResult,
    /// uniform evaluation grid over the domain
    pub points: Vec<f64>,
    pub solution: HashMap<String, DVector<f64>>,
    pub mean_absolute_residual: f64,
    pub statistics: HashMap<String, String>,
    pub csv: Option<PathBuf>,
}

fn rename_pseudonyms(doc: DocumentMap) -> Result<DocumentMap, CollocationError> {
    let mut renamed = DocumentMap::new();
    for (title, section) in doc {
        let canonical = SECTION_PSEUDONYMS
            .iter()
            .find(|(_, aliases)| aliases.contains(&title.as_str()))
            .map_or(title.clone(), |(name, _)| name.to_string());
        if !SECTIONS.contains(&canonical.as_str()) {
            return Err(CollocationError::configuration(format!(
                "unknown section '{}' in task document",
                title
            )));
        }
        if renamed.insert(canonical.clone(), section).is_some() {
            return Err(CollocationError::configuration(format!(
                "section '{}' is given more than once",
                canonical
            )));
        }
    }
    Ok(renamed)
}

fn check_keys(section: &SectionMap, name: &str, allowed: &[&str]) -> Result<(), CollocationError> {
    match section.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(CollocationError::configuration(format!(
            "unknown key '{}' in section '{}'",
            key, name
        ))),
        None => Ok(()),
    }
}

/// The single value of `key`, `None` if the key is absent or empty.
fn single<'s>(section: &'s SectionMap, key: &str) -> Result<Option<&'s Value>, CollocationError> {
    match section.get(key) {
        None | Some(None) => Ok(None),
        Some(Some(values)) => match values.as_slice() {
            [value] => Ok(Some(value)),
            list => Err(CollocationError::configuration(format!(
                "'{}' expects a single value, found {}",
                key,
                list.len()
            ))),
        },
    }
}

fn number(key: &str, value: &Value) -> Result<f64, CollocationError> {
    value.as_number().ok_or_else(|| {
        CollocationError::configuration(format!("'{}' must be a number, got '{}'", key, value))
    })
}

fn count(key: &str, value: &Value) -> Result<usize, CollocationError> {
    match value.as_integer() {
        Some(i) if i > 0 => Ok(i as usize),
        _ => Err(CollocationError::configuration(format!(
            "'{}' must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

fn uniform_mesh(domain: Domain, n: usize) -> Result<Vec<f64>, CollocationError> {
    if n < 2 {
        return Err(CollocationError::configuration(format!(
            "a mesh needs at least 2 points, got {}",
            n
        )));
    }
    let (a, b) = domain;
    let h = (b - a) / (n - 1) as f64;
    Ok((0..n).map(|i| a + i as f64 * h).collect())
}

impl CollocationTask {
    pub fn from_document(doc: DocumentMap) -> Result<Self, CollocationError> {
        let doc = rename_pseudonyms(doc)?;
        let model = validate_model_document(&doc)?;
        let params = match doc.get("parameters") {
            Some(section) => validate_params_section(Some(section))?,
            None => Params::new(),
        };
        validate_expression_symbols(&model, &params)?;

        let empty = SectionMap::new();
        // basis
        let basis = doc.get("basis").ok_or_else(|| {
            CollocationError::configuration("task document has no 'basis' section")
        })?;
        check_keys(basis, "basis", &["kind", "degree", "domain", "mesh_points"])?;
        let kind = match single(basis, "kind")? {
            Some(value) => {
                let name = value.to_string_value();
                BasisKind::from_str(&name).map_err(|_| {
                    CollocationError::configuration(format!(
                        "unknown basis '{}', expected Chebyshev, Legendre or Polynomial",
                        name
                    ))
                })?
            }
            None => return Err(CollocationError::configuration("basis kind is not given")),
        };
        let domain = match basis.get("domain") {
            Some(Some(values)) if values.len() == 2 => {
                (number("domain", &values[0])?, number("domain", &values[1])?)
            }
            _ => {
                return Err(CollocationError::configuration(
                    "domain must be given as two numbers: a, b",
                ));
            }
        };
        validate_domain(domain)?;
        let default_degree = single(basis, "degree")?
            .map(|v| count("degree", v))
            .transpose()?;
        let mesh_points = single(basis, "mesh_points")?
            .map(|v| count("mesh_points", v))
            .transpose()?
            .unwrap_or(DEFAULT_MESH_POINTS);

        // degrees
        let degree_section = doc.get("degrees").unwrap_or(&empty);
        let variables = model.dependent_vars();
        check_keys(
            degree_section,
            "degrees",
            &variables.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        )?;
        let mut degrees = Vec::with_capacity(variables.len());
        for var in variables {
            let degree = match single(degree_section, var)? {
                Some(value) => count(var, value)?,
                None => default_degree.ok_or_else(|| {
                    CollocationError::configuration(format!(
                        "no degree given for '{}' and no basis degree",
                        var
                    ))
                })?,
            };
            degrees.push((var.clone(), degree));
        }
        let degrees = Degrees::new(degrees);
        validate_degrees(&model, &degrees)?;

        // initial guess
        let guess_section = doc.get("initial_guess").unwrap_or(&empty);
        check_keys(
            guess_section,
            "initial_guess",
            &variables.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        )?;
        let mut initial_guess = HashMap::new();
        for var in variables {
            let guess = match single(guess_section, var)? {
                Some(value) => number(var, value)?,
                None => DEFAULT_GUESS,
            };
            if !guess.is_finite() {
                return Err(CollocationError::configuration(format!(
                    "initial guess of '{}' must be finite",
                    var
                )));
            }
            initial_guess.insert(var.clone(), guess);
        }

        // solver settings
        let settings = doc.get("solver_settings").unwrap_or(&empty);
        let mut numeric = HashMap::new();
        let mut loglevel = None;
        let mut log_to_file = false;
        for key in settings.keys() {
            let Some(value) = single(settings, key)? else {
                continue;
            };
            match key.as_str() {
                "loglevel" => loglevel = Some(value.to_string_value()),
                "log_to_file" => {
                    log_to_file = value.as_boolean().ok_or_else(|| {
                        CollocationError::configuration("log_to_file must be true or false")
                    })?
                }
                _ => {
                    numeric.insert(key.clone(), number(key, value)?);
                }
            }
        }
        let nonlinear_solver = LevenbergMarquardt::default().with_settings(&numeric)?;

        // postprocessing
        let post = doc.get("postprocessing").unwrap_or(&empty);
        check_keys(post, "postprocessing", &["evaluation_points", "save_to_csv"])?;
        let evaluation_points = single(post, "evaluation_points")?
            .map(|v| count("evaluation_points", v))
            .transpose()?
            .unwrap_or(DEFAULT_EVALUATION_POINTS);
        let save_to_csv = match single(post, "save_to_csv")? {
            None | Some(Value::Boolean(false)) => None,
            Some(Value::String(name)) if !name.eq_ignore_ascii_case("none") => {
                Some(PathBuf::from(name))
            }
            Some(Value::String(_)) => None,
            Some(other) => {
                return Err(CollocationError::configuration(format!(
                    "save_to_csv must be a file name or false, got '{}'",
                    other
                )));
            }
        };

        Ok(CollocationTask {
            model,
            params,
            kind,
            domain,
            degrees,
            mesh_points,
            initial_guess,
            nonlinear_solver,
            loglevel,
            log_to_file,
            evaluation_points,
            save_to_csv,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CollocationError> {
        let content = std::fs::read_to_string(path)?;
        info!("task read from {}", path.display());
        content.parse()
    }

    /// Fits the constant guesses, solves, evaluates the solution and its residual on the
    /// evaluation grid and saves the csv file if one was asked for.
    pub fn run(&self) -> Result<TaskReport, CollocationError> {
        let mut solver = CollocationSolver::new(&self.model, self.params.clone())?
            .with_nonlinear_solver(Box::new(self.nonlinear_solver.clone()));
        solver.loglevel = self.loglevel.clone();
        solver.log_to_file = self.log_to_file;

        let mesh = uniform_mesh(self.domain, self.mesh_points)?;
        let samples: HashMap<String, Vec<f64>> = self
            .initial_guess
            .iter()
            .map(|(var, guess)| (var.clone(), vec![*guess; mesh.len()]))
            .collect();
        let x0 = fit_initial_coefficients(self.kind, &self.degrees, self.domain, &mesh, &samples)?;
        let nodes = CollocationNodes::from_basis(self.kind, &self.degrees, self.domain);
        let result = solver
            .solve(&x0, &nodes, self.kind, self.domain, &self.degrees)?
            .clone();

        let points = uniform_mesh(self.domain, self.evaluation_points)?;
        let solution = solver.evaluate_solution(&points)?;
        let mean_absolute_residual = solver.mean_absolute_residual(&points)?;
        info!("mean absolute residual {:e}", mean_absolute_residual);
        if let Some(path) = &self.save_to_csv {
            solver.save_to_csv(&points, path)?;
        }
        Ok(TaskReport {
            result,
            points,
            solution,
            mean_absolute_residual,
            statistics: solver.statistics().clone(),
            csv: self.save_to_csv.clone(),
        })
    }
}

impl FromStr for CollocationTask {
    type Err = CollocationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let doc = parse_document_as(input, None).map_err(|e| {
            CollocationError::configuration(format!("cannot parse task document: {}", e))
        })?;
        CollocationTask::from_document(doc)
    }
}

pub const TEMPLATE: &str = r#"// heat exchanger: two counter-current streams, A is the exchange area
model
independent_var: A
dependent_vars: T1, T2
rhs
T1: -(T1 - T2)*U
T2: -0.5*(T1 - T2)*U
boundary_conditions
// expressions that vanish at the lower (upper) end of the domain, none for no condition
lower: T1 - T10
upper: T2 - T2Ahx
parameters
T10: 130
T2Ahx: 70
U: 1
basis
// Chebyshev, Legendre or Polynomial
kind: Legendre
degree: 15
domain: 0, 5
mesh_points: 1000
initial_guess
T1: 100
T2: 100
solver_settings
ftol: 1e-10
xtol: 1e-10
gtol: 1e-12
abs_tolerance: 1e-12
max_iterations: 100
initial_lambda: 1e-4
// off, none, error, warn, info, debug, trace
loglevel: info
log_to_file: false
postprocessing
evaluation_points: 1000
// file name or false
save_to_csv: false
"#;

/// Writes `TEMPLATE` to `path`.
pub fn create_template_file(path: &Path) -> Result<(), CollocationError> {
    std::fs::write(path, TEMPLATE)?;
    info!("task template written to {}", path.display());
    Ok(())
}
