//! Scene configuration (parsed from TOML)

use crate::animation::{ActivationGate, AnimationField};
use crate::buffer::{RenderSettings, ShadowCasting, DEFAULT_MAX_VERTICES};
use crate::mesh::{grid_triangle_count, SourceMesh, MAX_BUILTIN_TRIANGLES};
use crate::variant::{VariantKind, VariantParams, VariantTable};
use firefly_core::{FireflyError, Result, Transform};
use glam::Vec3;
use std::path::Path;

/// Effector transforms flatter than this cannot be inverted reliably
const MIN_EFFECTOR_DETERMINANT: f32 = 1e-9;

/// `[renderer]`: geometry capacity and draw settings shared by every target
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub max_vertices: usize,
    pub settings: RenderSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
            settings: RenderSettings::default(),
        }
    }
}

/// `[[effectors]]`: a noise volume placed in the world
#[derive(Debug, Clone, PartialEq)]
pub struct EffectorConfig {
    pub frequency: f32,
    pub amplitude: f32,
    pub transform: Transform,
}

impl Default for EffectorConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 1.0,
            transform: Transform::IDENTITY,
        }
    }
}

impl EffectorConfig {
    pub fn field(&self) -> AnimationField {
        AnimationField::effector(self.frequency, self.amplitude, &self.transform)
    }

    /// The volume must be invertible and its noise settings finite
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || !self.amplitude.is_finite() {
            return Err(FireflyError::InvalidConfig(format!(
                "effector frequency and amplitude must be finite, got {} and {}",
                self.frequency, self.amplitude
            )));
        }
        let det = self.transform.to_matrix().determinant();
        if det.is_nan() || det.abs() <= MIN_EFFECTOR_DETERMINANT {
            return Err(FireflyError::InvalidConfig(format!(
                "effector at {:?} has a singular transform (scale {:?})",
                self.transform.position, self.transform.scale
            )));
        }
        if !self.transform.to_inverse_matrix().is_finite() {
            return Err(FireflyError::InvalidConfig(
                "effector transform is not invertible".into(),
            ));
        }
        Ok(())
    }
}

/// Built-in source mesh for a `[[spawn]]` entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshShape {
    Quad { size: f32 },
    Grid { columns: u32, rows: u32, size: f32 },
    Icosphere { radius: f32, subdivisions: u32 },
}

impl MeshShape {
    pub const NAMES: [&'static str; 3] = ["quad", "grid", "icosphere"];

    /// Triangles `build` will produce, or None when the count overflows
    pub fn triangle_count(&self) -> Option<usize> {
        match *self {
            Self::Quad { .. } => Some(2),
            Self::Grid { columns, rows, .. } => grid_triangle_count(columns, rows),
            Self::Icosphere { subdivisions, .. } => {
                4usize.checked_pow(subdivisions)?.checked_mul(20)
            }
        }
    }

    pub fn build(&self) -> SourceMesh {
        match *self {
            Self::Quad { size } => SourceMesh::quad(size),
            Self::Grid {
                columns,
                rows,
                size,
            } => SourceMesh::grid(columns, rows, size),
            Self::Icosphere {
                radius,
                subdivisions,
            } => SourceMesh::icosphere(radius, subdivisions),
        }
    }
}

/// `[[spawn]]`: one mesh to cut into particles, optionally delayed
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnConfig {
    pub shape: MeshShape,
    pub transform: Transform,
    /// Frame at which the request is issued
    pub at_frame: u64,
    /// `[[spawn.variants]]`; the scene's variants when absent
    pub variants: Option<Vec<VariantParams>>,
    /// Per-spawn draw settings; `[renderer]` settings when absent
    pub settings: Option<RenderSettings>,
}

impl SpawnConfig {
    pub fn validate(&self) -> Result<()> {
        match self.shape.triangle_count() {
            Some(n) if n <= MAX_BUILTIN_TRIANGLES => {}
            count => {
                return Err(FireflyError::InvalidConfig(format!(
                    "{:?} is too large: {} triangles, limit is {MAX_BUILTIN_TRIANGLES}",
                    self.shape,
                    count.map_or_else(|| "overflowing".to_string(), |n| n.to_string())
                )))
            }
        }
        if let Some(variants) = &self.variants {
            validate_variants(variants)?;
        }
        self.shape.build().validate()
    }
}

/// Everything a scene file can set
#[derive(Debug, Clone, PartialEq)]
pub struct FireflyConfig {
    /// Seed for the noise permutation table
    pub seed: u32,
    pub renderer: RendererConfig,
    /// Global animation pass; replaced by effectors when any are present
    pub animation: AnimationField,
    pub effectors: Vec<EffectorConfig>,
    pub variants: Vec<VariantParams>,
    pub spawns: Vec<SpawnConfig>,
}

impl Default for FireflyConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            renderer: RendererConfig::default(),
            animation: AnimationField::default(),
            effectors: Vec::new(),
            variants: VariantParams::defaults(),
            spawns: Vec::new(),
        }
    }
}

impl FireflyConfig {
    /// Parse a FireflyConfig from a TOML document table
    pub fn from_toml(table: &toml::value::Table) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = table.get("seed") {
            config.seed = v.as_integer().unwrap_or(0) as u32;
        }
        if let Some(renderer) = table.get("renderer").and_then(|v| v.as_table()) {
            config.renderer = parse_renderer(renderer)?;
        }
        if let Some(animation) = table.get("animation").and_then(|v| v.as_table()) {
            config.animation = parse_animation(animation)?;
        }
        if let Some(effectors) = table.get("effectors").and_then(|v| v.as_array()) {
            config.effectors = effectors
                .iter()
                .filter_map(|v| v.as_table())
                .map(parse_effector)
                .collect();
        }
        if let Some(variants) = table.get("variants").and_then(|v| v.as_array()) {
            config.variants = variants
                .iter()
                .filter_map(|v| v.as_table())
                .map(parse_variant)
                .collect::<Result<_>>()?;
        }
        if let Some(spawns) = table.get("spawn").and_then(|v| v.as_array()) {
            config.spawns = spawns
                .iter()
                .filter_map(|v| v.as_table())
                .map(|spawn| parse_spawn(spawn, &config.renderer.settings))
                .collect::<Result<_>>()?;
        }

        Ok(config)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::value::Table = toml::from_str(source)?;
        Self::from_toml(&table)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let max_vertices = self.renderer.max_vertices;
        if max_vertices == 0 || max_vertices % 3 != 0 {
            return Err(FireflyError::InvalidConfig(format!(
                "renderer.max_vertices must be a positive multiple of 3, got {max_vertices}"
            )));
        }
        validate_variants(&self.variants)?;
        validate_field(&self.animation)?;
        for effector in &self.effectors {
            effector.validate()?;
        }
        for spawn in &self.spawns {
            spawn.validate()?;
        }
        Ok(())
    }

    /// The animation passes to run each frame
    pub fn fields(&self) -> Vec<AnimationField> {
        if self.effectors.is_empty() {
            vec![self.animation]
        } else {
            self.effectors.iter().map(EffectorConfig::field).collect()
        }
    }
}

fn validate_variants(variants: &[VariantParams]) -> Result<()> {
    for variant in variants {
        if variant.life.is_nan() || variant.life <= 0.0 {
            return Err(FireflyError::InvalidConfig(format!(
                "{} variant life must be positive, got {}",
                variant.kind.name(),
                variant.life
            )));
        }
        if !variant.size.is_finite() {
            return Err(FireflyError::InvalidConfig(format!(
                "{} variant size must be finite, got {}",
                variant.kind.name(),
                variant.size
            )));
        }
    }
    VariantTable::build(variants.iter().map(|v| (v.weight, ())))?;
    Ok(())
}

fn validate_field(field: &AnimationField) -> Result<()> {
    let gate_finite = match field.gate {
        ActivationGate::Always => true,
        ActivationGate::Sweep { delay, slope } => delay.is_finite() && slope.is_finite(),
        ActivationGate::Volume { world_to_local } => world_to_local.is_finite(),
    };
    let finite = field.frequency.is_finite() && field.amplitude.is_finite() && field.offset.is_finite();
    if !finite || !gate_finite {
        return Err(FireflyError::InvalidConfig(
            "animation settings must be finite numbers".into(),
        ));
    }
    Ok(())
}

fn parse_renderer(table: &toml::value::Table) -> Result<RendererConfig> {
    let mut renderer = RendererConfig::default();
    if let Some(v) = table.get("max_vertices") {
        let n = v.as_integer().unwrap_or(DEFAULT_MAX_VERTICES as i64);
        renderer.max_vertices = n.max(0) as usize;
    }
    parse_settings(table, &mut renderer.settings)?;
    Ok(renderer)
}

/// Apply `material`, `cast_shadows` and `receive_shadows`. Returns whether any was set.
fn parse_settings(table: &toml::value::Table, settings: &mut RenderSettings) -> Result<bool> {
    let mut touched = false;
    if let Some(s) = table.get("material").and_then(|v| v.as_str()) {
        settings.material = s.to_string();
        touched = true;
    }
    if let Some(s) = table.get("cast_shadows").and_then(|v| v.as_str()) {
        settings.cast_shadows = ShadowCasting::parse(s)?;
        touched = true;
    }
    if let Some(v) = table.get("receive_shadows") {
        settings.receive_shadows = v.as_bool().unwrap_or(true);
        touched = true;
    }
    Ok(touched)
}

fn parse_animation(table: &toml::value::Table) -> Result<AnimationField> {
    let mut field = AnimationField::default();
    if let Some(v) = table.get("frequency") {
        field.frequency = toml_f32(v, field.frequency);
    }
    if let Some(v) = table.get("amplitude") {
        field.amplitude = toml_f32(v, field.amplitude);
    }
    if let Some(v) = table.get("noise_offset") {
        field.offset = Vec3::splat(toml_f32(v, 100.0));
    }

    let delay = table.get("delay").map(|v| toml_f32(v, 2.0)).unwrap_or(2.0);
    let slope = table.get("slope").map(|v| toml_f32(v, 2.0)).unwrap_or(2.0);
    field.gate = match table.get("gate").and_then(|v| v.as_str()).unwrap_or("sweep") {
        "sweep" => ActivationGate::Sweep { delay, slope },
        "always" => ActivationGate::Always,
        other => {
            return Err(FireflyError::InvalidEnumValue {
                value: other.to_string(),
                allowed: vec!["sweep".into(), "always".into()],
            })
        }
    };
    Ok(field)
}

fn parse_transform(table: &toml::value::Table) -> Transform {
    let get = |key: &str, default: Vec3| table.get(key).map_or(default, |v| toml_vec3(v, default));
    Transform::IDENTITY
        .with_position(get("position", Vec3::ZERO))
        .with_rotation(get("rotation", Vec3::ZERO))
        .with_scale(get("scale", Vec3::ONE))
}

fn parse_effector(table: &toml::value::Table) -> EffectorConfig {
    let mut effector = EffectorConfig::default();
    if let Some(v) = table.get("frequency") {
        effector.frequency = toml_f32(v, effector.frequency);
    }
    if let Some(v) = table.get("amplitude") {
        effector.amplitude = toml_f32(v, effector.amplitude);
    }
    effector.transform = parse_transform(table);
    effector
}

fn parse_variant(table: &toml::value::Table) -> Result<VariantParams> {
    let kind = VariantKind::parse(
        table
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or("simple"),
    )?;
    let mut variant = VariantParams::new(kind);
    if let Some(v) = table.get("weight") {
        variant.weight = toml_f32(v, variant.weight);
    }
    if let Some(v) = table.get("life") {
        variant.life = toml_f32(v, variant.life);
    }
    if let Some(v) = table.get("size") {
        variant.size = toml_f32(v, variant.size);
    }
    Ok(variant)
}

fn parse_spawn(table: &toml::value::Table, defaults: &RenderSettings) -> Result<SpawnConfig> {
    let size = table.get("size").map(|v| toml_f32(v, 1.0)).unwrap_or(1.0);
    let shape = match table.get("mesh").and_then(|v| v.as_str()).unwrap_or("quad") {
        "quad" => MeshShape::Quad { size },
        "grid" => MeshShape::Grid {
            columns: toml_u32(table.get("columns"), 8),
            rows: toml_u32(table.get("rows"), 8),
            size,
        },
        "icosphere" => MeshShape::Icosphere {
            radius: table.get("radius").map(|v| toml_f32(v, 0.5)).unwrap_or(0.5),
            subdivisions: toml_u32(table.get("subdivisions"), 2).min(6),
        },
        other => {
            return Err(FireflyError::InvalidEnumValue {
                value: other.to_string(),
                allowed: MeshShape::NAMES.iter().map(|s| s.to_string()).collect(),
            })
        }
    };
    let variants = match table.get("variants").and_then(|v| v.as_array()) {
        Some(list) => Some(
            list.iter()
                .filter_map(|v| v.as_table())
                .map(parse_variant)
                .collect::<Result<Vec<_>>>()?,
        ),
        None => None,
    };
    let mut settings = defaults.clone();
    let settings = parse_settings(table, &mut settings)?.then_some(settings);

    Ok(SpawnConfig {
        shape,
        transform: parse_transform(table),
        at_frame: table
            .get("at_frame")
            .and_then(|v| v.as_integer())
            .unwrap_or(0)
            .max(0) as u64,
        variants,
        settings,
    })
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_u32(v: Option<&toml::Value>, default: u32) -> u32 {
    v.and_then(|v| v.as_integer())
        .map(|i| i.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(default)
}

fn toml_vec3(v: &toml::Value, default: Vec3) -> Vec3 {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return Vec3::new(
                toml_f32(&arr[0], default.x),
                toml_f32(&arr[1], default.y),
                toml_f32(&arr[2], default.z),
            );
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = FireflyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.renderer.max_vertices, 510_000);
        assert_eq!(config.variants.len(), 2);
        assert_eq!(config.fields().len(), 1);
        assert_eq!(config.animation.gate, ActivationGate::DEFAULT_SWEEP);
    }

    #[test]
    fn parse_from_toml() {
        let config = FireflyConfig::from_toml_str(
            r#"
seed = 42

[renderer]
max_vertices = 3000
material = "wings"
cast_shadows = "two_sided"
receive_shadows = false

[animation]
frequency = 4
amplitude = 0.5
gate = "always"

[[variants]]
kind = "disintegrator"
weight = 3
life = 2.5

[[variants]]
kind = "butterfly"
size = 0.01

[[spawn]]
mesh = "grid"
columns = 4
rows = 2
position = [0, 1, 0]
at_frame = 10
"#,
        )
        .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.renderer.max_vertices, 3000);
        assert_eq!(config.renderer.settings.material, "wings");
        assert_eq!(config.renderer.settings.cast_shadows, ShadowCasting::TwoSided);
        assert!(!config.renderer.settings.receive_shadows);
        assert!((config.animation.frequency - 4.0).abs() < 1e-6);
        assert_eq!(config.animation.gate, ActivationGate::Always);

        assert_eq!(config.variants.len(), 2);
        assert_eq!(config.variants[0].kind, VariantKind::Disintegrator);
        assert!((config.variants[0].weight - 3.0).abs() < 1e-6);
        assert!((config.variants[0].size - 0.01).abs() < 1e-6);
        assert!((config.variants[1].size - 0.01).abs() < 1e-6);

        let spawn = &config.spawns[0];
        assert_eq!(
            spawn.shape,
            MeshShape::Grid {
                columns: 4,
                rows: 2,
                size: 1.0
            }
        );
        assert_eq!(spawn.transform.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(spawn.at_frame, 10);
        config.validate().unwrap();
    }

    #[test]
    fn effectors_replace_the_global_field() {
        let config = FireflyConfig::from_toml_str(
            r#"
[[effectors]]
frequency = 2
amplitude = 0.1
position = [0, 0, 5]

[[effectors]]
scale = [2, 2, 2]
"#,
        )
        .unwrap();
        let fields = config.fields();
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].gate, ActivationGate::Volume { .. }));
        assert!((fields[0].amplitude - 0.1).abs() < 1e-6);
        assert_eq!(fields[0].offset, Vec3::new(0.0, 0.0, 100.0));
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            FireflyConfig::from_toml_str("[[variants]]\nkind = \"moth\""),
            Err(FireflyError::InvalidEnumValue { .. })
        ));
        assert!(FireflyConfig::from_toml_str("[renderer]\ncast_shadows = \"maybe\"").is_err());
        assert!(FireflyConfig::from_toml_str("[animation]\ngate = \"never\"").is_err());
        assert!(FireflyConfig::from_toml_str("[[spawn]]\nmesh = \"teapot\"").is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let config = FireflyConfig::from_toml_str("[renderer]\nmax_vertices = 1000").unwrap();
        assert!(matches!(config.validate(), Err(FireflyError::InvalidConfig(_))));

        let config = FireflyConfig::from_toml_str("[[variants]]\nweight = 0").unwrap();
        assert!(config.validate().is_err());

        let config = FireflyConfig::from_toml_str("[[variants]]\nlife = -1").unwrap();
        assert!(matches!(config.validate(), Err(FireflyError::InvalidConfig(_))));

        let config = FireflyConfig::from_toml_str("[[variants]]\nweight = -2\n[[variants]]\nweight = 5").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_grids_are_rejected_not_built() {
        let config =
            FireflyConfig::from_toml_str("[[spawn]]\nmesh = \"grid\"\ncolumns = 70000\nrows = 70000").unwrap();
        assert!(matches!(config.validate(), Err(FireflyError::InvalidConfig(_))));

        let config = FireflyConfig::from_toml_str(
            "[[spawn]]\nmesh = \"grid\"\ncolumns = 4294967295\nrows = 4294967295",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(FireflyError::InvalidConfig(_))));
        assert!(config.spawns[0].shape.triangle_count().is_none());
    }

    #[test]
    fn degenerate_effectors_are_rejected() {
        let flat = FireflyConfig::from_toml_str("[[effectors]]\nscale = [0, 0, 0]").unwrap();
        assert!(matches!(flat.validate(), Err(FireflyError::InvalidConfig(_))));

        let squashed = FireflyConfig::from_toml_str("[[effectors]]\nscale = [1, 0, 1]").unwrap();
        assert!(squashed.validate().is_err());

        let wild = FireflyConfig::from_toml_str("[[effectors]]\nfrequency = nan").unwrap();
        assert!(wild.validate().is_err());

        let fine = FireflyConfig::from_toml_str("[[effectors]]\nscale = [0.5, 2, 1]").unwrap();
        fine.validate().unwrap();
    }

    #[test]
    fn non_finite_animation_is_rejected() {
        let config = FireflyConfig::from_toml_str("[animation]\namplitude = inf").unwrap();
        assert!(matches!(config.validate(), Err(FireflyError::InvalidConfig(_))));
    }

    #[test]
    fn spawns_can_override_variants_and_settings() {
        let config = FireflyConfig::from_toml_str(
            r#"
[renderer]
material = "shards"
receive_shadows = false

[[spawn]]
mesh = "quad"
material = "wings"

[[spawn.variants]]
kind = "butterfly"
life = 9

[[spawn]]
mesh = "quad"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        let custom = &config.spawns[0];
        let variants = custom.variants.as_ref().unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, VariantKind::Butterfly);
        assert!((variants[0].life - 9.0).abs() < 1e-6);
        let settings = custom.settings.as_ref().unwrap();
        assert_eq!(settings.material, "wings");
        // Unset keys inherit from [renderer]
        assert!(!settings.receive_shadows);

        assert!(config.spawns[1].variants.is_none());
        assert!(config.spawns[1].settings.is_none());
    }

    #[test]
    fn spawn_variants_are_validated() {
        let config =
            FireflyConfig::from_toml_str("[[spawn]]\n[[spawn.variants]]\nweight = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            FireflyConfig::from_toml_str("seed = = 1"),
            Err(FireflyError::TomlParseError(_))
        ));
    }

    #[test]
    fn toml_integer_float_coercion() {
        let table: toml::value::Table = toml::from_str("v = [0, -10, 2.5]").unwrap();
        let v = toml_vec3(&table["v"], Vec3::ONE);
        assert_eq!(v, Vec3::new(0.0, -10.0, 2.5));
    }
}
