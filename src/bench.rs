//! Timed comparison of join algorithms and index kinds on synthetic data.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::data_type::DataType;
use crate::error::{Result, SchemaError};
use crate::index::{Index, IndexKind};
use crate::join::{Algorithm, DEFAULT_BLOCK_SIZE, JoinCondition, JoinContext};
use crate::relation::{Relation, RelationBuilder, Row};
use crate::schema::{ColumnDef, ColumnRef, Schema};
use crate::value::Value;

/// A relation of `rows` rows with one integer column per entry of `columns`,
/// each value drawn uniformly from `[0, max_value)`. The same seed always
/// produces the same relation.
///
/// # Errors
/// [SchemaError::DuplicateColumn] if a column name repeats.
///
/// # Example
/// ```
/// use reldb::bench::generate_relation;
///
/// let r = generate_relation("r", &["a", "b"], 100, 10, 7).unwrap();
/// assert_eq!(r.row_count(), 100);
/// assert_eq!(r, generate_relation("r", &["a", "b"], 100, 10, 7).unwrap());
/// ```
pub fn generate_relation(
    name: &str,
    columns: &[&str],
    rows: usize,
    max_value: i64,
    seed: u64,
) -> Result<Relation, SchemaError> {
    let max_value = max_value.max(1);
    let schema = Schema::new(
        columns
            .iter()
            .map(|column| ColumnDef::new(*column, DataType::Int))
            .collect(),
    )?;
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut builder = RelationBuilder::new(name, schema);
    for _ in 0..rows {
        let row: Row = columns
            .iter()
            .map(|_| Value::Int(rng.gen_range(0..max_value)))
            .collect();
        builder.push_row(row)?;
    }
    Ok(builder.build())
}

/// Rows of a relation as a sorted multiset, for order-insensitive comparison.
fn canonical(relation: &Relation) -> Vec<Row> {
    let mut rows: Vec<Row> = relation.rows().collect();
    rows.sort_unstable();
    rows
}

/// Timings of one algorithm on one input size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub algorithm: Algorithm,
    /// Rows of each input relation
    pub size: usize,
    /// Wall-clock time of every repetition, in run order
    pub elapsed: Vec<Duration>,
    pub output_rows: usize,
}

impl Measurement {
    pub fn mean(&self) -> Duration {
        let count = u32::try_from(self.elapsed.len()).unwrap_or(u32::MAX).max(1);
        self.elapsed.iter().sum::<Duration>() / count
    }

    pub fn min(&self) -> Duration {
        self.elapsed.iter().min().copied().unwrap_or_default()
    }
}

/// Two algorithms returned different row multisets for the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disagreement {
    pub size: usize,
    pub algorithm: Algorithm,
    /// The algorithm whose result was taken as the reference
    pub reference: Algorithm,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinReport {
    pub measurements: Vec<Measurement>,
    pub disagreements: Vec<Disagreement>,
}

impl JoinReport {
    pub fn all_agree(&self) -> bool {
        self.disagreements.is_empty()
    }
}

/// Joins `r(a, b)` with `s(b, c)` on `r.b = s.b` for every algorithm and
/// size, `repetitions` times each. [JoinBenchmark::run_on] takes caller
/// supplied relations instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinBenchmark {
    pub algorithms: Vec<Algorithm>,
    pub sizes: Vec<usize>,
    pub repetitions: usize,
    /// Join key values are drawn from `[0, max_value)`
    pub max_value: i64,
    pub seed: u64,
    pub block_size: usize,
}

impl Default for JoinBenchmark {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::ALL.to_vec(),
            sizes: vec![100, 1_000],
            repetitions: 3,
            max_value: 100,
            seed: 42,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl JoinBenchmark {
    /// The relations joined at `size`.
    pub fn inputs(&self, size: usize) -> Result<(Relation, Relation), SchemaError> {
        let seed = self.seed.wrapping_add(size as u64);
        Ok((
            generate_relation("r", &["a", "b"], size, self.max_value, seed)?,
            generate_relation("s", &["b", "c"], size, self.max_value, seed.wrapping_add(1))?,
        ))
    }

    pub fn condition() -> JoinCondition {
        JoinCondition::equi("r.b", "s.b")
    }

    /// Runs every (size, algorithm) pair over the generated relations.
    ///
    /// # Errors
    /// The first join failure; no partial report is returned.
    pub fn run(&self) -> Result<JoinReport> {
        let condition = Self::condition();
        let inputs = self
            .sizes
            .iter()
            .map(|&size| self.inputs(size))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        let borrowed: Vec<(&Relation, &Relation, &JoinCondition)> = inputs
            .iter()
            .map(|(left, right)| (left, right, &condition))
            .collect();
        self.run_on(&borrowed)
    }

    /// Runs every algorithm on each `(left, right, condition)` input, in
    /// order. `sizes`, `max_value` and `seed` are not used. The size recorded
    /// for an input is the row count of its left relation.
    ///
    /// The first algorithm that can evaluate an input's condition gives the
    /// reference result for that input. Algorithms that cannot evaluate it
    /// (hash or sort-merge on a theta join) are skipped.
    ///
    /// # Errors
    /// The first join failure; no partial report is returned.
    pub fn run_on(&self, inputs: &[(&Relation, &Relation, &JoinCondition)]) -> Result<JoinReport> {
        let mut report = JoinReport::default();
        for &(left, right, condition) in inputs {
            let size = left.row_count();
            let context = JoinContext::new(left, right, condition).with_block_size(self.block_size);
            let mut reference: Option<(Algorithm, Vec<Row>)> = None;

            for &algorithm in &self.algorithms {
                if !algorithm.supports(condition) {
                    log::warn!(
                        "skipping {algorithm} join of {} and {}: cannot evaluate {condition}",
                        left.name(),
                        right.name()
                    );
                    continue;
                }
                let mut elapsed = Vec::with_capacity(self.repetitions);
                let mut output = None;
                for _ in 0..self.repetitions.max(1) {
                    let start = Instant::now();
                    let result = context.execute(algorithm)?;
                    elapsed.push(start.elapsed());
                    output.get_or_insert(result);
                }
                let Some(output) = output else { continue };

                let rows = canonical(&output);
                match &reference {
                    None => reference = Some((algorithm, rows)),
                    Some((expected_algorithm, expected)) if *expected != rows => {
                        log::warn!(
                            "{algorithm} join disagrees with {expected_algorithm} at size {size}: {} rows instead of {}",
                            rows.len(),
                            expected.len()
                        );
                        report.disagreements.push(Disagreement {
                            size,
                            algorithm,
                            reference: *expected_algorithm,
                        });
                    }
                    Some(_) => {}
                }

                let measurement = Measurement {
                    algorithm,
                    size,
                    elapsed,
                    output_rows: output.row_count(),
                };
                log::info!(
                    "{algorithm} join, size {size}: {} rows, mean {:?}",
                    measurement.output_rows,
                    measurement.mean()
                );
                report.measurements.push(measurement);
            }
        }
        Ok(report)
    }
}

/// Cost of building and probing one index kind on one input size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexMeasurement {
    pub kind: IndexKind,
    pub size: usize,
    pub build: Duration,
    /// Total time of all point lookups
    pub lookups: Duration,
    /// Positions returned by all point lookups
    pub hits: usize,
    /// Time of one range scan over the middle half of the key domain,
    /// `None` for kinds without range support
    pub range: Option<Duration>,
    pub range_hits: usize,
    pub memory_bytes: usize,
}

/// Builds every index kind over `t.k` and probes it with random keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBenchmark {
    pub kinds: Vec<IndexKind>,
    pub sizes: Vec<usize>,
    pub lookups: usize,
    pub max_value: i64,
    pub seed: u64,
}

impl Default for IndexBenchmark {
    fn default() -> Self {
        Self {
            kinds: vec![IndexKind::Hash, IndexKind::Ordered],
            sizes: vec![1_000, 10_000],
            lookups: 1_000,
            max_value: 1_000,
            seed: 42,
        }
    }
}

impl IndexBenchmark {
    /// # Errors
    /// Index build or lookup failures.
    pub fn run(&self) -> Result<Vec<IndexMeasurement>> {
        let key = [ColumnRef::new("k")];
        let mut measurements = Vec::new();
        for &size in &self.sizes {
            let relation = generate_relation("t", &["k", "v"], size, self.max_value, self.seed)?;
            for &kind in &self.kinds {
                let start = Instant::now();
                let index = Index::build(&relation, &key, kind)?;
                let build = start.elapsed();

                let mut rng = Pcg64::seed_from_u64(self.seed);
                let probes: Vec<Value> = (0..self.lookups)
                    .map(|_| Value::Int(rng.gen_range(0..self.max_value.max(1))))
                    .collect();
                let start = Instant::now();
                let mut hits = 0;
                for probe in &probes {
                    hits += index.lookup(std::slice::from_ref(probe))?.len();
                }
                let lookups = start.elapsed();

                let (range, range_hits) = match kind {
                    IndexKind::Hash => (None, 0),
                    IndexKind::Ordered => {
                        let lower = [Value::Int(self.max_value / 4)];
                        let upper = [Value::Int(self.max_value / 4 * 3)];
                        let start = Instant::now();
                        let positions = index.range_lookup(&lower, &upper)?;
                        (Some(start.elapsed()), positions.len())
                    }
                };

                let measurement = IndexMeasurement {
                    kind,
                    size,
                    build,
                    lookups,
                    hits,
                    range,
                    range_hits,
                    memory_bytes: index.memory_footprint(),
                };
                log::info!(
                    "{kind} index, size {size}: built in {:?}, {} lookups in {:?}, {} bytes",
                    measurement.build,
                    self.lookups,
                    measurement.lookups,
                    measurement.memory_bytes
                );
                measurements.push(measurement);
            }
        }
        Ok(measurements)
    }
}
