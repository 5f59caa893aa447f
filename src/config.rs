//! Session configuration
//!
//! Every field has a default, so a YAML file only needs the keys it
//! overrides:
//!
//! ```yaml
//! seed_ontology: true
//! layout:
//!   reheat_alpha: 0.3
//!   ontology_link_distance: 120
//! placement:
//!   jitter: 25
//!   seed: 7
//! queue:
//!   pacing_ms: 1500
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Physics coefficients and state-machine thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Visual center the centering force pulls toward
    pub center_x: f32,
    pub center_y: f32,
    /// Energy at first start
    pub alpha_start: f32,
    /// Floor below which the layout is Settled
    pub alpha_min: f32,
    /// Fraction of the remaining distance to `alpha_target` covered per tick
    pub alpha_decay: f32,
    /// Energy injected by a data change (never exceeded by a reheat)
    pub reheat_alpha: f32,
    /// Energy held while a node is being dragged
    pub drag_alpha_target: f32,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f32,
    /// Per-tick displacement cap
    pub max_speed: f32,
    /// Repulsion strength between every pair of bodies
    pub repulsion: f32,
    /// Barnes-Hut opening angle; 0 disables the approximation
    pub theta: f32,
    /// Spring strength along links
    pub link_strength: f32,
    pub link_distance: f32,
    pub ontology_link_distance: f32,
    /// Strength of the centroid shift toward the center
    pub centering_strength: f32,
    /// Per-body pull toward the center, scaled by alpha; bounds the spread
    pub center_pull: f32,
    pub collision_radius: f32,
    pub class_collision_radius: f32,
    /// Ticks per second for the animation driver
    pub frame_rate: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            alpha_start: 1.0,
            alpha_min: 0.001,
            alpha_decay: 0.0228,
            reheat_alpha: 0.3,
            drag_alpha_target: 0.3,
            velocity_decay: 0.4,
            max_speed: 40.0,
            repulsion: 900.0,
            theta: 0.9,
            link_strength: 0.1,
            link_distance: 60.0,
            ontology_link_distance: 120.0,
            centering_strength: 0.1,
            center_pull: 0.1,
            collision_radius: 12.0,
            class_collision_radius: 24.0,
            frame_rate: 60,
        }
    }
}

impl LayoutConfig {
    pub fn with_center(mut self, x: f32, y: f32) -> Self {
        self.center_x = x;
        self.center_y = y;
        self
    }

    pub fn with_reheat_alpha(mut self, alpha: f32) -> Self {
        self.reheat_alpha = alpha;
        self
    }

    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

/// Initial placement of new nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Half-width of the uniform jitter around the layout center
    pub jitter: f32,
    /// Seed for reproducible placement; entropy when absent
    pub seed: Option<u64>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            jitter: 25.0,
            seed: None,
        }
    }
}

impl PlacementConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Ingestion pacing and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Delay between consecutive subjects
    pub pacing_ms: u64,
    /// Upper bound on one collaborator call
    pub call_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 1500,
            call_timeout_ms: 60_000,
        }
    }
}

impl QueueConfig {
    pub fn with_pacing_ms(mut self, pacing_ms: u64) -> Self {
        self.pacing_ms = pacing_ms;
        self
    }

    pub fn with_call_timeout_ms(mut self, call_timeout_ms: u64) -> Self {
        self.call_timeout_ms = call_timeout_ms;
        self
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Top-level configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pre-seed new stores with the upper ontology
    pub seed_ontology: bool,
    pub layout: LayoutConfig,
    pub placement: PlacementConfig,
    pub queue: QueueConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed_ontology: true,
            layout: LayoutConfig::default(),
            placement: PlacementConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_seed_ontology(mut self, seed_ontology: bool) -> Self {
        self.seed_ontology = seed_ontology;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_placement(mut self, placement: PlacementConfig) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Parse YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Read a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config_dir>/ontoloom/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ontoloom").join("config.yaml"))
    }

    /// Load from `path` if given, else from the default location when that
    /// file exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = SessionConfig::from_yaml("queue:\n  pacing_ms: 10\n").unwrap();
        assert_eq!(config.queue.pacing_ms, 10);
        assert_eq!(config.queue.call_timeout_ms, QueueConfig::default().call_timeout_ms);
        assert_eq!(config.layout, LayoutConfig::default());
        assert!(config.seed_ontology);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "seed_ontology: false\nplacement:\n  jitter: 5\n  seed: 42\nlayout:\n  reheat_alpha: 0.2"
        )
        .unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert!(!config.seed_ontology);
        assert_eq!(config.placement.seed, Some(42));
        assert_eq!(config.placement.jitter, 5.0);
        assert_eq!(config.layout.reheat_alpha, 0.2);
    }

    #[test]
    fn load_reports_missing_file_and_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(SessionConfig::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "layout: [1, 2").unwrap();
        assert!(matches!(SessionConfig::load(&bad), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn explicit_path_wins_in_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "queue:\n  pacing_ms: 3\n").unwrap();
        let config = SessionConfig::resolve(Some(path.as_path())).unwrap();
        assert_eq!(config.queue.pacing(), Duration::from_millis(3));
    }

    #[test]
    fn frame_interval_follows_frame_rate() {
        let layout = LayoutConfig {
            frame_rate: 50,
            ..LayoutConfig::default()
        };
        assert_eq!(layout.frame_interval(), Duration::from_millis(20));
    }
}
