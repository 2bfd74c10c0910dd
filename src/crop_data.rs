use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::dataset;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	#[error("failed to read {}: {source}", .path.display())]
	Io { path: PathBuf, source: io::Error },

	#[error("{} has no header row", .path.display())]
	Empty { path: PathBuf },

	#[error("{} is missing column {column:?}", .path.display())]
	MissingColumn { path: PathBuf, column: &'static str },

	#[error("{}:{line}: expected {expected} fields, found {found}", .path.display())]
	RowLength { path: PathBuf, line: usize, expected: usize, found: usize },

	#[error("{}:{line}: invalid {column} value {value:?}", .path.display())]
	InvalidNumber { path: PathBuf, line: usize, column: &'static str, value: String },

	#[error("{}:{line}: empty label", .path.display())]
	EmptyLabel { path: PathBuf, line: usize },
}

/// Parsed rows plus the width of the header, which may include columns the
/// model does not use.
#[derive(Debug)]
pub struct CropTable {
	pub builder: dataset::Builder,
	pub columns: usize,
}

/// Reads a crop CSV with a header row. Columns are located by name, extra
/// columns are ignored and blank lines are skipped.
pub fn read(path: &Path) -> Result<CropTable, LoadError> {
	let file = fs::File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
	from_reader(io::BufReader::new(file), path)
}

pub fn from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<CropTable, LoadError> {
	let io_error = |source: io::Error| LoadError::Io { path: origin.to_path_buf(), source };
	let mut lines = reader.lines().enumerate();

	let header = match lines.next() {
		Some((_, line)) => line.map_err(io_error)?,
		None => return Err(LoadError::Empty { path: origin.to_path_buf() }),
	};
	let header = fields(header.trim_start_matches('\u{feff}'));

	let position = |column: &'static str| {
		header
			.iter()
			.position(|&h| h == column)
			.ok_or_else(|| LoadError::MissingColumn { path: origin.to_path_buf(), column })
	};

	let mut feature_columns = [0; FEATURE_COUNT];
	for (slot, &name) in feature_columns.iter_mut().zip(FEATURE_NAMES.iter()) {
		*slot = position(name)?;
	}
	let label_column = position(LABEL_COLUMN)?;

	let mut builder = dataset::Builder::new();
	let mut row = [0.0; FEATURE_COUNT];

	for (i, line) in lines {
		let line = line.map_err(io_error)?;
		if line.trim().is_empty() {
			continue;
		}

		let line_no = i + 1;
		let values = fields(&line);
		if values.len() != header.len() {
			return Err(LoadError::RowLength {
				path: origin.to_path_buf(),
				line: line_no,
				expected: header.len(),
				found: values.len(),
			});
		}

		for ((x, &column), &name) in row.iter_mut().zip(feature_columns.iter()).zip(FEATURE_NAMES.iter()) {
			*x = values[column].parse::<f64>().map_err(|_| LoadError::InvalidNumber {
				path: origin.to_path_buf(),
				line: line_no,
				column: name,
				value: values[column].to_string(),
			})?;
		}

		let label = values[label_column];
		if label.is_empty() {
			return Err(LoadError::EmptyLabel { path: origin.to_path_buf(), line: line_no });
		}

		builder.add(&row, label);
	}

	Ok(CropTable { builder, columns: header.len() })
}

fn fields(line: &str) -> Vec<&str> {
	line.split(',')
		.map(|x| x.trim().trim_matches('"'))
		.collect()
}
