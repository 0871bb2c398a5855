use crate::potential::evaluator::FieldValues;
use chrono::Local;
use csv::Writer;
use simplelog::*;
use std::fs::File;
use std::io;
use std::path::Path;

/// Maps a textual log level onto a filter; `None` means "info".
pub fn level_filter(loglevel: Option<&str>) -> Result<LevelFilter, String> {
    match loglevel {
        None => Ok(LevelFilter::Info),
        Some(level) => match level {
            "debug" => Ok(LevelFilter::Debug),
            "info" => Ok(LevelFilter::Info),
            "warn" => Ok(LevelFilter::Warn),
            "error" => Ok(LevelFilter::Error),
            "off" => Ok(LevelFilter::Off),
            _ => Err(format!(
                "loglevel must be debug, info, warn, error or off, got '{}'",
                level
            )),
        },
    }
}

/// Installs the global logger: terminal output, plus a `log_<date_time>.txt` file when
/// `to_file` is set. Fails if the level is unknown or a logger is already installed.
pub fn init_logger(loglevel: Option<&str>, to_file: bool) -> Result<(), String> {
    let log_option = level_filter(loglevel)?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if to_file {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        let file = File::create(&name).map_err(|e| format!("cannot create {}: {}", name, e))?;
        loggers.push(WriteLogger::new(log_option, Config::default(), file));
    }
    CombinedLogger::init(loggers).map_err(|e| e.to_string())
}

/// Writes the sampled field as a matrix: the header row holds the x axis, every following
/// row starts with its y value.
pub fn save_field_to_csv(field: &FieldValues, filename: &Path) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    let mut header = vec!["y\\x".to_string()];
    header.extend(field.x_axis().iter().map(|x| x.to_string()));
    writer.write_record(&header)?;

    for (y, row) in field.y_axis().iter().zip(field.values().rows()) {
        let mut row_data = vec![y.to_string()];
        row_data.extend(row.iter().map(|val| val.to_string()));
        writer.write_record(&row_data)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::compute;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(None).unwrap(), LevelFilter::Info);
        assert_eq!(level_filter(Some("debug")).unwrap(), LevelFilter::Debug);
        assert_eq!(level_filter(Some("off")).unwrap(), LevelFilter::Off);
        assert!(level_filter(Some("verbose")).is_err());
    }

    #[test]
    fn test_save_field_to_csv() {
        let solution = compute("-x", "-y").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.csv");
        save_field_to_csv(&solution.field, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), 401);
        assert_eq!(&header[0], "y\\x");
        assert_eq!(header[1].parse::<f64>().unwrap(), -10.0);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 400);
        // U(-10, -10) = 100
        assert_eq!(rows[0][0].parse::<f64>().unwrap(), -10.0);
        assert!((rows[0][1].parse::<f64>().unwrap() - 100.0).abs() < 1e-9);
    }
}
