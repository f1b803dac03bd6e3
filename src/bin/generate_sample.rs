use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use hrtf_match::data::model::{FEATURES, Feature, Table};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const SUBJECTS: usize = 60;
const X_COLUMNS: usize = 17;
const D_COLUMNS: usize = 19;

/// (mean, std) in cm of the X block: head/torso.
fn x_profile(col: usize) -> (f64, f64) {
    match col {
        0 => (15.2, 0.6),   // head width
        1 => (22.0, 1.2),   // head height
        2 => (19.4, 0.8),   // head depth
        13 => (174.0, 9.0), // height
        14 => (91.0, 4.0),  // seated height
        15 => (57.0, 1.8),  // head circumference
        16 => (112.0, 8.0), // shoulder circumference
        _ => (10.0, 1.0),
    }
}

/// (mean, std) in cm of the D block: pinna.
fn d_profile(col: usize) -> (f64, f64) {
    match col {
        0 | 16 => (1.8, 0.2), // cavum concha height
        1 | 17 => (0.7, 0.1), // cymba concha height
        2 => (1.8, 0.2),      // cavum concha width
        3 => (1.6, 0.2),      // fossa height
        4 => (6.5, 0.5),      // pinna height
        5 | 18 => (3.2, 0.3), // pinna width
        _ => (1.0, 0.2),
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let mut all_id: Vec<i64> = Vec::new();
    let mut all_x: Vec<Vec<Option<f64>>> = Vec::new();
    let mut all_d: Vec<Vec<Option<f64>>> = Vec::new();
    let mut all_weight: Vec<f64> = Vec::new();

    for i in 0..SUBJECTS {
        let x: Vec<Option<f64>> = (0..X_COLUMNS)
            .map(|c| {
                let (mu, sigma) = x_profile(c);
                Some(rng.gauss(mu, sigma))
            })
            .collect();
        let mut d: Vec<Option<f64>> = (0..D_COLUMNS)
            .map(|c| {
                let (mu, sigma) = d_profile(c);
                Some(rng.gauss(mu, sigma))
            })
            .collect();

        // Some subjects only have the alternate pinna columns.
        if i % 7 == 3 {
            d[5] = None;
        }
        if i % 11 == 5 {
            d[0] = None;
            d[1] = None;
        }

        all_id.push(3001 + i as i64);
        all_x.push(x);
        all_d.push(d);
        all_weight.push(rng.gauss(74.0, 11.0));
    }

    // Build Arrow arrays
    let list_array = |rows: &[Vec<Option<f64>>]| {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for row in rows {
            let values = builder.values();
            for &v in row {
                values.append_option(v);
            }
            builder.append(true);
        }
        builder.finish()
    };
    let x_array = list_array(&all_x);
    let d_array = list_array(&all_d);
    let id_array = Int64Array::from(all_id);
    let weight_array = Float64Array::from(all_weight);

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("x", list_type.clone(), false),
        Field::new("d", list_type, false),
        Field::new("weight", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(id_array),
            Arc::new(x_array),
            Arc::new(d_array),
            Arc::new(weight_array),
        ],
    )
    .context("creating RecordBatch")?;

    // Write Parquet
    let output_path = "data.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    // A listener drawn from the same distribution.
    let measurements_path = "measurements.csv";
    let mut csv = csv::Writer::from_path(measurements_path).context("creating measurements CSV")?;
    csv.write_record(["feature", "unit", "value"])?;
    for spec in &FEATURES {
        let (value, unit) = match spec.feature {
            Feature::Weight => (rng.gauss(74.0, 11.0), "kg"),
            Feature::EarInsideLength => {
                let mut sum = 0.0;
                for c in [0, 1, 3] {
                    let (mu, sigma) = d_profile(c);
                    sum += rng.gauss(mu, sigma);
                }
                (sum, "cm")
            }
            _ => {
                let comp = spec.components[0];
                let (mu, sigma) = match comp.table {
                    Table::D => d_profile(comp.primary),
                    _ => x_profile(comp.primary),
                };
                (rng.gauss(mu, sigma), "cm")
            }
        };
        let value = format!("{value:.2}");
        csv.write_record([spec.feature.name(), unit, value.as_str()])?;
    }
    csv.flush()?;

    println!(
        "Wrote {SUBJECTS} reference subjects to {output_path} and a listener to {measurements_path}"
    );
    Ok(())
}
