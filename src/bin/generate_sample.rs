//! Write a folder of synthetic drive-test exports.
//!
//! Usage: `generate_sample [OUTPUT_DIR]` (default `sample_drive_tests`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

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

/// One sample of a simulated drive.
struct Sample {
    time: String,
    cell_id: i64,
    rsrp: Option<f64>,
    cinr: f64,
    speed_kmh: f64,
}

/// A serving cell along the route: id, mean RSRP (dBm), mean CINR (dB).
type CellProfile = (i64, f64, f64);

/// Drive past `cells` in order, one sample per second, handing over to the
/// next cell every `samples_per_cell` samples.
fn simulate_drive(
    cells: &[CellProfile],
    samples_per_cell: usize,
    start_secs: u32,
    rng: &mut SimpleRng,
) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(cells.len() * samples_per_cell);
    for (c, &(cell_id, rsrp_mean, cinr_mean)) in cells.iter().enumerate() {
        for k in 0..samples_per_cell {
            let t = start_secs + (c * samples_per_cell + k) as u32;
            // Signal fades towards the cell edge.
            let edge = (k as f64 / samples_per_cell as f64 - 0.5).abs() * 2.0;
            let rsrp = rng.gauss(rsrp_mean - 12.0 * edge, 4.0);
            let cinr = rng.gauss(cinr_mean - 6.0 * edge, 2.5);
            // Occasional dropouts leave a gap in the export.
            let rsrp = (rng.next_f64() > 0.02).then_some(rsrp);
            samples.push(Sample {
                time: format!(
                    "{:02}:{:02}:{:02}.000",
                    (t / 3600) % 24,
                    (t / 60) % 60,
                    t % 60
                ),
                cell_id,
                rsrp,
                cinr,
                speed_kmh: rng.gauss(50.0, 8.0).max(0.0),
            });
        }
    }
    samples
}

fn write_csv(path: &Path, samples: &[Sample]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    // Padded header names, as the measurement tool writes them.
    writer.write_record([
        "Time",
        " Cell ID (0)",
        " R0 RSRP (0)",
        " R0 RS CINR (0)",
        " Speed (km/h)",
    ])?;
    for s in samples {
        writer.write_record([
            s.time.clone(),
            s.cell_id.to_string(),
            s.rsrp.map(|v| format!("{v:.2}")).unwrap_or_default(),
            format!("{:.2}", s.cinr),
            format!("{:.1}", s.speed_kmh),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, samples: &[Sample]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Time", DataType::Utf8, false),
        Field::new("Cell ID (0)", DataType::Int64, false),
        Field::new("R0 RSRP (0)", DataType::Float64, true),
        Field::new("R0 RS CINR (0)", DataType::Float64, false),
        Field::new("Speed (km/h)", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                samples.iter().map(|s| s.time.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                samples.iter().map(|s| s.cell_id).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                samples.iter().map(|s| s.rsrp).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                samples.iter().map(|s| s.cinr).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                samples.iter().map(|s| s.speed_kmh).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_drive_tests"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let routes: [(&str, Vec<CellProfile>); 3] = [
        ("city_center", vec![(301, -85.0, 14.0), (302, -92.0, 9.0), (303, -98.0, 6.0)]),
        ("highway", vec![(410, -97.0, 7.0), (411, -103.0, 3.0), (412, -95.0, 8.0), (413, -108.0, 1.0)]),
        ("suburb", vec![(520, -101.0, 5.0), (521, -94.0, 10.0)]),
    ];

    let mut start = 9 * 3600;
    let mut written = 0;
    for (name, cells) in &routes {
        let samples = simulate_drive(cells, 120, start, &mut rng);
        start += samples.len() as u32 + 600;
        write_csv(&out_dir.join(format!("{name}.csv")), &samples)?;
        written += samples.len();
        if *name == "highway" {
            write_parquet(&out_dir.join(format!("{name}.parquet")), &samples)?;
        }
    }

    // A broken export, to show how the viewer reports skipped files.
    std::fs::write(
        out_dir.join("truncated.csv"),
        "Time,R0 RSRP (0)\n09:00:00.000,-90.0\n",
    )
    .context("writing truncated.csv")?;

    println!(
        "Wrote {written} samples over {} routes to {}",
        routes.len(),
        out_dir.display()
    );
    Ok(())
}
