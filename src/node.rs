use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

const LEAF: u16 = 0;
const CHILDREN: u16 = 1;

// Deeper trees than this are never produced by fitting, so they indicate a
// damaged artifact.
const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
	pub value: f64,
	pub column: usize,
}

impl Split {
	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		writer.write_f64::<BigEndian>(self.value)?;
		writer.write_u16::<BigEndian>(to_u16(self.column, "split column")?)?;

		Ok(())
	}

	pub fn deserialize<R: Read>(reader: &mut R, n_features: usize) -> io::Result<Self> {
		let value = reader.read_f64::<BigEndian>()?;
		let column = reader.read_u16::<BigEndian>()? as usize;

		if column >= n_features || !value.is_finite() {
			return Err(invalid(format!("bad split on column {} at {}", column, value)));
		}

		Ok(Self { value, column })
	}
}

/// A fitted tree node. Leaves hold the class distribution of the training
/// rows that reached them.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Leaf(Vec<f64>),
	Children {
		left: Box<Node>,
		right: Box<Node>,
		split: Split,
	},
}

impl Node {
	pub fn predict(&self, x: &[f64]) -> &[f64] {
		match self {
			Node::Leaf(distribution) => distribution.as_slice(),
			Node::Children { left, right, split } => {
				if x[split.column] <= split.value {
					left.predict(x)
				} else {
					right.predict(x)
				}
			},
		}
	}

	pub fn leaves(&self) -> usize {
		match self {
			Node::Leaf(_) => 1,
			Node::Children { left, right, .. } => left.leaves() + right.leaves(),
		}
	}

	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		match &self {
			Node::Leaf(distribution) => {
				writer.write_u16::<BigEndian>(LEAF)?;
				writer.write_u16::<BigEndian>(to_u16(distribution.len(), "leaf width")?)?;
				for &p in distribution {
					writer.write_f64::<BigEndian>(p)?;
				}
			},
			Node::Children { left, right, split } => {
				writer.write_u16::<BigEndian>(CHILDREN)?;
				split.serialize(writer)?;
				left.serialize(writer)?;
				right.serialize(writer)?;
			}
		}

		Ok(())
	}

	pub fn deserialize<R: Read>(reader: &mut R, n_features: usize, n_classes: usize) -> io::Result<Self> {
		Self::read_node(reader, n_features, n_classes, 0)
	}

	fn read_node<R: Read>(reader: &mut R, n_features: usize, n_classes: usize, depth: usize) -> io::Result<Self> {
		if depth > MAX_DEPTH {
			return Err(invalid(format!("tree deeper than {}", MAX_DEPTH)));
		}

		match reader.read_u16::<BigEndian>()? {
			LEAF => {
				let len = reader.read_u16::<BigEndian>()? as usize;
				if len != n_classes {
					return Err(invalid(format!("leaf has {} classes, expected {}", len, n_classes)));
				}

				let distribution = (0..len)
					.map(|_| reader.read_f64::<BigEndian>())
					.collect::<io::Result<Vec<f64>>>()?;

				if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
					return Err(invalid("leaf holds a negative or non-finite probability".to_string()));
				}

				Ok(Node::Leaf(distribution))
			},
			CHILDREN => {
				let split = Split::deserialize(reader, n_features)?;
				let left = Box::new(Self::read_node(reader, n_features, n_classes, depth + 1)?);
				let right = Box::new(Self::read_node(reader, n_features, n_classes, depth + 1)?);

				Ok(Node::Children { split, left, right })
			},
			i => Err(invalid(format!("unknown tree type {:?}", i))),
		}
	}
}

pub(crate) fn invalid(message: String) -> io::Error {
	io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Narrows a count to the `u16` the format stores it in.
pub(crate) fn to_u16(value: usize, what: &str) -> io::Result<u16> {
	u16::try_from(value).map_err(|_| {
		io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("{} {} does not fit the model format (max {})", what, value, u16::MAX),
		)
	})
}
