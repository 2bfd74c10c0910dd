use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::dataset::Dataset;
use crate::classifier::Classifier;
use crate::decision_tree::{DecisionTreeBuilder, DecisionTree};
use crate::node::{invalid, to_u16};

const MAGIC: &[u8; 4] = b"CRF1";

#[derive(Debug, Clone)]
pub struct RandomForestBuilder {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Bootstrap sample size as a fraction of the training rows.
    pub bag_amount: f64,
    pub seed: u64,
}

impl Default for RandomForestBuilder {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 20,
            min_samples_split: 5,
            min_samples_leaf: 2,
            bag_amount: 1.0,
            seed: 42,
        }
    }
}

impl RandomForestBuilder {
    pub fn fit(&self, dataset: &Dataset) -> RandomForestClassifier {
        let feature_len = (dataset.features_len() as f64).sqrt().ceil() as usize;
        let whole = Instant::now();
        let done = AtomicUsize::new(0);

        let forest = self.get_rngs()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|mut rng| {
                let now = Instant::now();
                let tree = self.fit_tree(&mut rng, dataset, feature_len);

                let i = done.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    tree = i,
                    of = self.n_trees,
                    leaves = tree.leaves(),
                    elapsed_ms = now.elapsed().as_millis() as u64,
                    "fitted tree"
                );

                tree
            })
            .collect::<Vec<_>>();

        debug!(trees = forest.len(), elapsed_ms = whole.elapsed().as_millis() as u64, "forest fitted");

        RandomForestClassifier {
            classes: dataset.classes().to_vec(),
            n_features: dataset.features_len(),
            forest,
        }
    }

    fn fit_tree<R: Rng + ?Sized>(&self, rng: &mut R, dataset: &Dataset, feature_len: usize) -> DecisionTree {
        let builder = DecisionTreeBuilder {
            max_features: Some(feature_len),
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        };

        let max_samples = (dataset.rows_len() as f64 * self.bag_amount) as usize;
        let bootstrapped = dataset.bootstrap(rng, max_samples);

        builder.fit(rng, bootstrapped)
    }

    // One generator per tree, all derived from the forest seed, so the result
    // does not depend on how rayon schedules the fits.
    fn get_rngs(&self) -> impl Iterator<Item = StdRng> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.n_trees).map(move |_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            StdRng::from_seed(seed)
        })
    }
}

/// A fitted forest together with the crop names its class indices refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestClassifier {
    classes: Vec<String>,
    n_features: usize,
    forest: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn features_len(&self) -> usize {
        self.n_features
    }

    pub fn trees_len(&self) -> usize {
        self.forest.len()
    }

    /// Writes the model to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        self.serialize(&mut writer)?;
        writer.flush()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::deserialize(&mut reader)
    }
}

impl Classifier for RandomForestClassifier {
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut probabilities = vec![0.0; self.classes.len()];

        for tree in &self.forest {
            for (total, p) in probabilities.iter_mut().zip(tree.predict_proba(x)) {
                *total += p;
            }
        }

        let n = self.forest.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= n);
        probabilities
    }

    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u16::<BigEndian>(to_u16(self.n_features, "feature count")?)?;
        writer.write_u16::<BigEndian>(to_u16(self.classes.len(), "class count")?)?;

        for class in &self.classes {
            writer.write_u16::<BigEndian>(to_u16(class.len(), "class name length")?)?;
            writer.write_all(class.as_bytes())?;
        }

        writer.write_u16::<BigEndian>(to_u16(self.forest.len(), "tree count")?)?;

        for tree in &self.forest {
            tree.serialize(writer)?;
        }

        Ok(())
    }

    fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(invalid("not a crop model file".to_string()));
        }

        let n_features = reader.read_u16::<BigEndian>()? as usize;
        let n_classes = reader.read_u16::<BigEndian>()? as usize;
        if n_features == 0 || n_classes == 0 {
            return Err(invalid(format!("empty model shape {}x{}", n_features, n_classes)));
        }

        let classes = (0..n_classes)
            .map(|_| {
                let len = reader.read_u16::<BigEndian>()? as usize;
                let mut bytes = vec![0u8; len];
                reader.read_exact(&mut bytes)?;
                String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
            })
            .collect::<io::Result<Vec<String>>>()?;

        let len = reader.read_u16::<BigEndian>()?;
        if len == 0 {
            return Err(invalid("model has no trees".to_string()));
        }

        let forest = (0..len)
            .map(|_| DecisionTree::deserialize(reader, n_features, n_classes))
            .collect::<io::Result<Vec<DecisionTree>>>()?;

        Ok(Self {
            classes,
            n_features,
            forest,
        })
    }
}
