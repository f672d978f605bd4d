//! 3D icon models: which model shows which category, and loading them from disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::metric::Metric;
use crate::tier::Tier;

/// A family of icon models, each in its own directory under the asset root.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    Weather,
    AirQuality,
}

impl AssetCategory {
    pub fn dir(self) -> &'static str {
        match self {
            AssetCategory::Weather => "weather",
            AssetCategory::AirQuality => "air quality",
        }
    }
}

/// Names one model file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    pub category: AssetCategory,
    pub file: &'static str,
}

impl core::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.category.dir(), self.file)
    }
}

const fn weather(file: &'static str) -> AssetKey {
    AssetKey {
        category: AssetCategory::Weather,
        file,
    }
}

const fn air_quality(file: &'static str) -> AssetKey {
    AssetKey {
        category: AssetCategory::AirQuality,
        file,
    }
}

const CLEAR_SKY: AssetKey = weather("Clear sky.obj");
const MAINLY_CLEAR: AssetKey = weather("Mainly clear.obj");
const PARTLY_CLOUDY: AssetKey = weather("Partly cloudy.obj");
const OVERCAST: AssetKey = weather("Overcast.obj");
const DRIZZLE: AssetKey = weather("drizzle.obj");
const RAINY: AssetKey = weather("rainy.obj");
const SNOW: AssetKey = weather("snow.obj");
const THUNDERSTORM: AssetKey = weather("thunderstorm.obj");

const HAPPY: AssetKey = air_quality("happy.obj");
const SMILE: AssetKey = air_quality("smile.obj");
const SAD: AssetKey = air_quality("sad.obj");

impl AssetKey {
    /// Every model `resolve` can name.
    pub const ALL: [AssetKey; 11] = [
        CLEAR_SKY,
        MAINLY_CLEAR,
        PARTLY_CLOUDY,
        OVERCAST,
        DRIZZLE,
        RAINY,
        SNOW,
        THUNDERSTORM,
        HAPPY,
        SMILE,
        SAD,
    ];
}

/// WMO weather interpretation code to model. Unknown codes show overcast.
fn weather_model(code: f64) -> AssetKey {
    if !code.is_finite() {
        return OVERCAST;
    }
    match code.round() as i64 {
        0 => CLEAR_SKY,
        1 => MAINLY_CLEAR,
        2 => PARTLY_CLOUDY,
        3 | 45 | 48 => OVERCAST,
        51 | 53 | 55 | 56 | 57 => DRIZZLE,
        61 | 63 | 65 | 66 | 67 | 80 | 81 | 82 => RAINY,
        71 | 73 | 75 | 77 | 85 | 86 => SNOW,
        95 | 96 | 99 => THUNDERSTORM,
        _ => OVERCAST,
    }
}

/// Map a category code to the model that shows it and the model's color.
pub fn resolve(category: AssetCategory, code: f64) -> (AssetKey, Rgb888) {
    match category {
        AssetCategory::Weather => (weather_model(code), Rgb888::WHITE),
        AssetCategory::AirQuality => {
            let tier = Metric::EuropeanAqi
                .info()
                .thresholds
                .map(|t| t.classify(code))
                .unwrap_or(Tier::Poor);
            let key = match tier {
                Tier::Good => HAPPY,
                Tier::Moderate => SMILE,
                Tier::Poor => SAD,
            };
            (key, tier.color())
        }
    }
}

/// A triangle mesh, flattened: xyz per vertex, three indices per triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    pub normals: Vec<f32>,
}

impl Geometry {
    pub fn vertex(&self, i: u32) -> [f32; 3] {
        let i = i as usize * 3;
        [self.positions[i], self.positions[i + 1], self.positions[i + 2]]
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Bounding box: (min, max) corners.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut lo = [f32::INFINITY; 3];
        let mut hi = [f32::NEG_INFINITY; 3];
        for p in self.positions.chunks_exact(3) {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
        }
        (lo, hi)
    }

    /// Append a mesh, computing vertex normals from its faces if it has none.
    fn append(&mut self, mesh: &tobj::Mesh) {
        let base = (self.positions.len() / 3) as u32;
        self.positions.extend_from_slice(&mesh.positions);
        self.indices.extend(mesh.indices.iter().map(|i| i + base));
        if mesh.normals.len() == mesh.positions.len() {
            self.normals.extend_from_slice(&mesh.normals);
        } else {
            self.normals
                .extend(face_normals(&mesh.positions, &mesh.indices));
        }
    }
}

/// Area-weighted vertex normals.
fn face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];
    let at = |i: u32| {
        let i = i as usize * 3;
        [positions[i], positions[i + 1], positions[i + 2]]
    };
    for t in indices.chunks_exact(3) {
        let (a, b, c) = (at(t[0]), at(t[1]), at(t[2]));
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        for &i in t {
            let i = i as usize * 3;
            for axis in 0..3 {
                normals[i + axis] += n[axis];
            }
        }
    }
    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 0.0 {
            n.iter_mut().for_each(|c| *c /= len);
        }
    }
    normals
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The model file is missing, unreadable, or has no triangles.
    #[error("model {key} not found at {}: {reason}", path.display())]
    NotFound {
        key: AssetKey,
        path: PathBuf,
        reason: String,
    },
}

/// Loads models from the asset root, keeping each for the life of the library.
///
/// Failed loads are not cached; the next request tries the disk again.
#[derive(Debug)]
pub struct AssetLibrary {
    root: PathBuf,
    cache: HashMap<AssetKey, Arc<Geometry>>,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        AssetLibrary {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: AssetKey) -> PathBuf {
        self.root.join(key.category.dir()).join(key.file)
    }

    /// Number of models loaded so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn load(&mut self, key: AssetKey) -> Result<Arc<Geometry>, AssetError> {
        if let Some(geometry) = self.cache.get(&key) {
            return Ok(geometry.clone());
        }
        let path = self.path(key);
        let not_found = |reason: String| AssetError::NotFound {
            key,
            path: path.clone(),
            reason,
        };

        let (models, _materials) =
            tobj::load_obj(&path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| not_found(e.to_string()))?;
        let mut geometry = Geometry {
            positions: Vec::new(),
            indices: Vec::new(),
            normals: Vec::new(),
        };
        for model in &models {
            geometry.append(&model.mesh);
        }
        if geometry.indices.is_empty() {
            return Err(not_found("no triangles".to_owned()));
        }

        tracing::debug!(
            "loaded {}: {} vertices, {} triangles",
            key,
            geometry.positions.len() / 3,
            geometry.indices.len() / 3
        );
        let geometry = Arc::new(geometry);
        self.cache.insert(key, geometry.clone());
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{GREEN, RED, YELLOW};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn library_with(files: &[(AssetKey, &str)]) -> (tempfile::TempDir, AssetLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let library = AssetLibrary::new(dir.path());
        for (key, contents) in files {
            let path = library.path(*key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        (dir, library)
    }

    #[test]
    fn weather_codes() {
        let file = |code| resolve(AssetCategory::Weather, code).0.file;
        assert_eq!(file(0.0), "Clear sky.obj");
        assert_eq!(file(1.0), "Mainly clear.obj");
        assert_eq!(file(2.0), "Partly cloudy.obj");
        assert_eq!(file(45.0), "Overcast.obj");
        assert_eq!(file(55.0), "drizzle.obj");
        assert_eq!(file(81.0), "rainy.obj");
        assert_eq!(file(86.0), "snow.obj");
        assert_eq!(file(96.0), "thunderstorm.obj");
        assert_eq!(file(4.0), "Overcast.obj");
        assert_eq!(file(f64::NAN), "Overcast.obj");
        assert_eq!(resolve(AssetCategory::Weather, 0.0).1, Rgb888::WHITE);
    }

    #[test]
    fn air_quality_codes() {
        assert_eq!(resolve(AssetCategory::AirQuality, 15.0), (HAPPY, GREEN));
        assert_eq!(resolve(AssetCategory::AirQuality, 30.0), (SMILE, YELLOW));
        assert_eq!(resolve(AssetCategory::AirQuality, 55.0), (SAD, RED));
        assert_eq!(HAPPY.file, "happy.obj");
        assert_eq!(SMILE.file, "smile.obj");
        assert_eq!(SAD.file, "sad.obj");
    }

    #[test]
    fn paths_use_category_dirs() {
        let library = AssetLibrary::new("Objects");
        assert_eq!(
            library.path(SMILE),
            PathBuf::from("Objects/air quality/smile.obj")
        );
        assert_eq!(
            library.path(CLEAR_SKY),
            PathBuf::from("Objects/weather/Clear sky.obj")
        );
    }

    #[test]
    fn loads_and_computes_normals() {
        let (_dir, mut library) = library_with(&[(CLEAR_SKY, TRIANGLE)]);
        let geometry = library.load(CLEAR_SKY).expect("triangle loads");
        assert_eq!(geometry.positions.len(), 9);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.normals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(geometry.bounds(), ([0.0, 0.0, 0.0], [1.0, 1.0, 0.0]));
    }

    #[test]
    fn loads_are_cached() {
        let (_dir, mut library) = library_with(&[(HAPPY, TRIANGLE)]);
        let first = library.load(HAPPY).unwrap();
        std::fs::remove_file(library.path(HAPPY)).unwrap();
        let second = library.load(HAPPY).expect("served from cache");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(library.cached(), 1);
    }

    #[test]
    fn missing_file_is_not_found_and_not_cached() {
        let (_dir, mut library) = library_with(&[]);
        let err = library.load(SAD).unwrap_err();
        assert!(matches!(err, AssetError::NotFound { key, .. } if key == SAD));
        assert_eq!(library.cached(), 0);

        let path = library.path(SAD);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, TRIANGLE).unwrap();
        assert!(library.load(SAD).is_ok());
    }

    #[test]
    fn file_without_faces_is_not_found() {
        let (_dir, mut library) = library_with(&[(RAINY, "# nothing here\n")]);
        assert!(matches!(
            library.load(RAINY),
            Err(AssetError::NotFound { .. })
        ));
    }
}
