use crate::numerical::Collocation::collocation_errors::CollocationError;
use chrono::Local;
use csv::Writer;
use nalgebra::DMatrix;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::path::Path;

/// `None` for "off"/"none", `Info` when no level is given.
pub fn parse_loglevel(level: Option<&str>) -> Result<Option<LevelFilter>, CollocationError> {
    let Some(level) = level else {
        return Ok(Some(LevelFilter::Info));
    };
    match level.trim().to_lowercase().as_str() {
        "off" | "none" => Ok(None),
        "trace" => Ok(Some(LevelFilter::Trace)),
        "debug" => Ok(Some(LevelFilter::Debug)),
        "info" => Ok(Some(LevelFilter::Info)),
        "warn" => Ok(Some(LevelFilter::Warn)),
        "error" => Ok(Some(LevelFilter::Error)),
        other => Err(CollocationError::configuration(format!(
            "loglevel must be off, none, trace, debug, info, warn or error, got '{}'",
            other
        ))),
    }
}

/// Timestamped log file name, e.g. `log_2024-05-01_12-00-00.txt`.
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Terminal logger plus an optional file logger. A second call is a no-op: the first logger
/// installed stays active.
pub fn init_logger(level: LevelFilter, file: Option<&Path>) -> Result<(), CollocationError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path)?));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// Writes `x_mesh` as the first column (titled `arg`) followed by one column per header.
pub fn save_matrix_to_csv(
    matrix: &DMatrix<f64>,
    headers: &[String],
    path: &Path,
    x_mesh: &[f64],
    arg: &str,
) -> Result<(), CollocationError> {
    if matrix.nrows() != x_mesh.len() {
        return Err(CollocationError::shape("csv rows", x_mesh.len(), matrix.nrows()));
    }
    if matrix.ncols() != headers.len() {
        return Err(CollocationError::shape("csv columns", headers.len(), matrix.ncols()));
    }
    let mut writer = Writer::from_path(path)?;
    let mut headers_with_x = Vec::with_capacity(headers.len() + 1);
    headers_with_x.push(arg.to_string());
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;

    for (i, row) in matrix.row_iter().enumerate() {
        let mut row_data = Vec::with_capacity(row.len() + 1);
        row_data.push(x_mesh[i].to_string());
        row_data.extend(row.iter().map(|val| val.to_string()));
        writer.write_record(&row_data)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel(None).unwrap(), Some(LevelFilter::Info));
        assert_eq!(parse_loglevel(Some("off")).unwrap(), None);
        assert_eq!(parse_loglevel(Some("none")).unwrap(), None);
        assert_eq!(parse_loglevel(Some("Debug")).unwrap(), Some(LevelFilter::Debug));
        assert!(parse_loglevel(Some("loud")).is_err());
    }

    #[test]
    fn test_double_init_is_ignored() {
        assert!(init_logger(LevelFilter::Warn, None).is_ok());
        assert!(init_logger(LevelFilter::Warn, None).is_ok());
    }

    #[test]
    fn test_save_matrix_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solution.csv");
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.5]);
        save_matrix_to_csv(
            &matrix,
            &["T1".to_string(), "T2".to_string()],
            &path,
            &[0.0, 5.0],
            "A",
        )
        .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "A,T1,T2\n0,1,2\n5,3,4.5\n");

        let bad = save_matrix_to_csv(&matrix, &["T1".to_string()], &path, &[0.0, 5.0], "A");
        assert!(matches!(bad, Err(CollocationError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("log_") && name.ends_with(".txt"));
    }
}
