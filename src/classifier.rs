use std::io::{Read, Write};
use crate::functions::argmax;

pub trait Classifier: Sized {
	/// Probability of every class for one feature row.
	fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

	fn predict(&self, x: &[f64]) -> usize {
		argmax(&self.predict_proba(x))
	}

	fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
	fn deserialize<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}
