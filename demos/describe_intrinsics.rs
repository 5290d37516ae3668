//! Camera Intrinsics Inspector
//!
//! Loads pinhole intrinsics from an archive YAML (as written by
//! `CameraIntrinsics::save_to_yaml`) or from a Kalibr `camchain` file, prints
//! them and optionally projects a 3D point given in camera coordinates.
//!
//! Usage:
//! ```bash
//! cargo run --example describe_intrinsics -- \
//!   --format kalibr \
//!   --input-path samples/kalibr_cam0.yaml \
//!   --point 0.1 -0.2 2.0
//! ```

use clap::Parser;
use log::info;
use nalgebra::Vector3;
use std::path::PathBuf;
use tracking_math::camera::{CameraError, CameraIntrinsics};

/// Camera intrinsics inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Format of the input file (archive, kalibr)
    #[arg(short = 'f', long, default_value = "archive")]
    format: String,

    /// Path to the intrinsics YAML file
    #[arg(short = 'p', long)]
    input_path: PathBuf,

    /// 3D point in camera coordinates to project
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    point: Option<Vec<f64>>,
}

fn load_intrinsics(format: &str, path: &str) -> Result<CameraIntrinsics<f64>, CameraError> {
    match format.to_lowercase().as_str() {
        "archive" | "yaml" => {
            info!("Loading intrinsics archive from: {}", path);
            CameraIntrinsics::load_from_yaml(path)
        }
        "kalibr" => {
            info!("Loading Kalibr calibration from: {}", path);
            CameraIntrinsics::load_from_kalibr_yaml(path)
        }
        other => Err(CameraError::InvalidParams(format!(
            "Unsupported input format: {other}. Supported formats: archive, kalibr"
        ))),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let path = cli.input_path.to_string_lossy();
    let intrinsics = load_intrinsics(&cli.format, &path)?;
    print!("{intrinsics}");

    if let Some(coords) = cli.point {
        let point = Vector3::new(coords[0], coords[1], coords[2]);
        let pixel = intrinsics.project(&point)?;
        println!("Projection of [{}, {}, {}]: [{}, {}]", point.x, point.y, point.z, pixel.x, pixel.y);

        let ray = intrinsics.unproject(&pixel)?;
        println!("Back-projected ray: [{}, {}, {}]", ray.x, ray.y, ray.z);
    }

    Ok(())
}
