//! Persisted representation of [`CameraIntrinsics`].
//!
//! The archive is a single ordered sequence:
//!
//! 1. the 9 matrix entries, row-major,
//! 2. the dimension (width, height),
//! 3. `radial_size`,
//! 4. exactly `radial_size` radial coefficients,
//! 5. the tangential count marker (always 2),
//! 6. the 2 tangential coefficients.
//!
//! The inverse matrix is never persisted; loading re-derives it from the
//! stored matrix. Any serde format can carry the archive, and the YAML/JSON
//! helpers below cover the common cases. Kalibr `cam0` blocks can be imported
//! with [`CameraIntrinsics::load_from_kalibr_yaml`].

use crate::camera::{CameraError, CameraIntrinsics, Resolution, TANGENTIAL_SLOTS};
use log::debug;
use nalgebra::{Matrix3, RealField, Vector2, Vector6};
use serde::de::{self, DeserializeOwned, SeqAccess, Unexpected, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use yaml_rust::{Yaml, YamlLoader};

impl<T> Serialize for CameraIntrinsics<T>
where
    T: RealField + Copy + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 9 + 2 + 1 + self.radial_size() + 1 + TANGENTIAL_SLOTS;
        let mut seq = serializer.serialize_seq(Some(len))?;

        let matrix = self.matrix();
        for i in 0..9 {
            seq.serialize_element(&matrix[(i / 3, i % 3)])?;
        }

        let dimension = self.dimension();
        seq.serialize_element(&dimension.width)?;
        seq.serialize_element(&dimension.height)?;

        seq.serialize_element(&self.radial_size())?;
        for k in self.radial() {
            seq.serialize_element(k)?;
        }

        seq.serialize_element(&TANGENTIAL_SLOTS)?;
        let tangential = self.tangential_params();
        seq.serialize_element(&tangential[0])?;
        seq.serialize_element(&tangential[1])?;

        seq.end()
    }
}

struct IntrinsicsVisitor<T>(PhantomData<T>);

fn next_field<'de, A, V>(
    seq: &mut A,
    index: &mut usize,
    expected: &dyn de::Expected,
) -> Result<V, A::Error>
where
    A: SeqAccess<'de>,
    V: Deserialize<'de>,
{
    let value = seq
        .next_element()?
        .ok_or_else(|| de::Error::invalid_length(*index, expected))?;
    *index += 1;
    Ok(value)
}

impl<'de, T> Visitor<'de> for IntrinsicsVisitor<T>
where
    T: RealField + Copy + Deserialize<'de>,
{
    type Value = CameraIntrinsics<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a camera intrinsics archive sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut index = 0;

        let mut matrix = Matrix3::zeros();
        for i in 0..9 {
            matrix[(i / 3, i % 3)] = next_field::<A, T>(&mut seq, &mut index, &self)?;
        }

        let width: usize = next_field(&mut seq, &mut index, &self)?;
        let height: usize = next_field(&mut seq, &mut index, &self)?;

        let radial_size: usize = next_field(&mut seq, &mut index, &self)?;
        if !matches!(radial_size, 0 | 2 | 6) {
            return Err(de::Error::invalid_value(
                Unexpected::Unsigned(radial_size as u64),
                &"a radial size of 0, 2 or 6",
            ));
        }
        let mut radial = Vector6::zeros();
        for i in 0..radial_size {
            radial[i] = next_field::<A, T>(&mut seq, &mut index, &self)?;
        }

        let tangential_size: usize = next_field(&mut seq, &mut index, &self)?;
        if tangential_size != TANGENTIAL_SLOTS {
            return Err(de::Error::invalid_value(
                Unexpected::Unsigned(tangential_size as u64),
                &"a tangential size of 2",
            ));
        }
        let p1: T = next_field(&mut seq, &mut index, &self)?;
        let p2: T = next_field(&mut seq, &mut index, &self)?;

        CameraIntrinsics::from_parts(
            matrix,
            Resolution::new(width, height),
            radial_size,
            radial,
            Vector2::new(p1, p2),
        )
        .map_err(de::Error::custom)
    }
}

impl<'de, T> Deserialize<'de> for CameraIntrinsics<T>
where
    T: RealField + Copy + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(IntrinsicsVisitor(PhantomData))
    }
}

impl<T> CameraIntrinsics<T>
where
    T: RealField + Copy + Serialize,
{
    /// Saves the intrinsics archive to a YAML file.
    ///
    /// # Errors
    ///
    /// * [`CameraError::YamlError`]: if serialization fails.
    /// * [`CameraError::IOError`]: if the file cannot be created or written.
    ///
    /// # Related
    /// * [`CameraIntrinsics::load_from_yaml()`]
    pub fn save_to_yaml(&self, path: &str) -> Result<(), CameraError> {
        let yaml_string = serde_yaml::to_string(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;
        debug!("Saved camera intrinsics to {path}");
        Ok(())
    }

    /// Serializes the intrinsics archive to a JSON array.
    pub fn to_json(&self) -> Result<String, CameraError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T> CameraIntrinsics<T>
where
    T: RealField + Copy + DeserializeOwned,
{
    /// Loads an intrinsics archive from a YAML file written by
    /// [`save_to_yaml`](Self::save_to_yaml).
    ///
    /// # Errors
    ///
    /// * [`CameraError::IOError`]: if the file cannot be read.
    /// * [`CameraError::YamlError`]: if the document is not a valid archive,
    ///   including a singular matrix or an unsupported radial size.
    pub fn load_from_yaml(path: &str) -> Result<Self, CameraError> {
        let contents = fs::read_to_string(path)?;
        let intrinsics = serde_yaml::from_str(&contents)?;
        debug!("Loaded camera intrinsics from {path}");
        Ok(intrinsics)
    }

    /// Parses an intrinsics archive from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, CameraError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn yaml_number(value: &Yaml) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

fn yaml_numbers(node: &Yaml, name: &str, expected: usize) -> Result<Vec<f64>, CameraError> {
    let values = node.as_vec().ok_or_else(|| {
        CameraError::InvalidParams(format!("YAML missing '{name}' or not an array"))
    })?;
    if values.len() != expected {
        return Err(CameraError::InvalidParams(format!(
            "Expected {expected} values in '{name}', found {}",
            values.len()
        )));
    }
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            yaml_number(value).ok_or_else(|| {
                CameraError::InvalidParams(format!("Invalid '{name}' value at index {i}"))
            })
        })
        .collect()
}

impl<T: RealField + Copy> CameraIntrinsics<T> {
    /// Imports the `cam0` block of a Kalibr camchain YAML file.
    ///
    /// Only the `pinhole` camera model with `radtan` distortion is accepted.
    /// The resulting intrinsics carry two radial coefficients and the file's
    /// resolution as dimension.
    ///
    /// # Errors
    ///
    /// * [`CameraError::IOError`]: if the file cannot be read.
    /// * [`CameraError::YamlError`]: if the YAML content is malformed.
    /// * [`CameraError::InvalidParams`]: if fields are missing, mistyped or name
    ///   an unsupported model.
    /// * [`CameraError::SingularMatrix`]: if the focal lengths produce a singular matrix.
    pub fn load_from_kalibr_yaml(path: &str) -> Result<Self, CameraError> {
        let contents = fs::read_to_string(path)?;
        Self::from_kalibr_str(&contents)
    }

    /// Same as [`load_from_kalibr_yaml`](Self::load_from_kalibr_yaml) on an in-memory document.
    pub fn from_kalibr_str(contents: &str) -> Result<Self, CameraError> {
        let docs = YamlLoader::load_from_str(contents)?;
        let doc = docs
            .first()
            .ok_or_else(|| CameraError::InvalidParams("Empty YAML document".to_string()))?;
        let cam = &doc["cam0"];
        if cam.is_badvalue() {
            return Err(CameraError::InvalidParams(
                "YAML missing 'cam0'".to_string(),
            ));
        }

        if let Some(model) = cam["camera_model"].as_str() {
            if model != "pinhole" {
                return Err(CameraError::InvalidParams(format!(
                    "Unsupported camera model: {model}"
                )));
            }
        }
        if let Some(model) = cam["distortion_model"].as_str() {
            if model != "radtan" {
                return Err(CameraError::InvalidParams(format!(
                    "Unsupported distortion model: {model}"
                )));
            }
        }

        let intrinsics = yaml_numbers(&cam["intrinsics"], "intrinsics", 4)?;
        let distortion = yaml_numbers(&cam["distortion_coeffs"], "distortion_coeffs", 4)?;

        let resolution_yaml = cam["resolution"].as_vec().ok_or_else(|| {
            CameraError::InvalidParams("YAML missing 'resolution' or not an array".to_string())
        })?;
        if resolution_yaml.len() != 2 {
            return Err(CameraError::InvalidParams(
                "Expected 2 values in 'resolution'".to_string(),
            ));
        }
        let mut dims = [0usize; 2];
        for (dim, value) in dims.iter_mut().zip(resolution_yaml) {
            *dim = value
                .as_i64()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    CameraError::InvalidParams(
                        "Invalid resolution: not a positive integer".to_string(),
                    )
                })? as usize;
        }

        let c = |v: f64| -> T { nalgebra::convert(v) };
        let matrix = Matrix3::new(
            c(intrinsics[0]),
            T::zero(),
            c(intrinsics[2]),
            T::zero(),
            c(intrinsics[1]),
            c(intrinsics[3]),
            T::zero(),
            T::zero(),
            T::one(),
        );

        let mut intrinsics = Self::with_radial2(
            matrix,
            Vector2::new(c(distortion[0]), c(distortion[1])),
            Vector2::new(c(distortion[2]), c(distortion[3])),
        )?;
        intrinsics.set_dimension(Resolution::new(dims[0], dims[1]));
        Ok(intrinsics)
    }
}
