use anyhow::{ensure, Context};
use patterncore::grid::Scaling;
use patterncore::prelude::{ParseOptions, Polarization};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub parse: ParseOptions,
    /// Resample every theta ring to this azimuth step before compiling.
    pub interpolate_azimuth_step: Option<f64>,
    /// Re-index turntable measurements onto the positioner axis.
    pub turntable_transform: bool,
    pub system_impedance: f64,
    pub polarizations: Vec<Polarization>,
    pub angle_azimuth: Option<f64>,
    pub angle_elevation: Option<f64>,
    pub scaling: Scaling,
    pub include_grids: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            interpolate_azimuth_step: None,
            turntable_transform: false,
            system_impedance: 50.0,
            polarizations: vec![Polarization::Sum],
            angle_azimuth: None,
            angle_elevation: None,
            scaling: Scaling::default(),
            include_grids: false,
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading pipeline config {}", path_ref.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing pipeline config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_args(
        parse: ParseOptions,
        system_impedance: f64,
        polarizations: Vec<Polarization>,
    ) -> Self {
        Self {
            parse,
            system_impedance,
            polarizations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(step) = self.interpolate_azimuth_step {
            ensure!(step > 0.0, "interpolate_azimuth_step must be positive, got {}", step);
        }
        ensure!(
            !self.turntable_transform || self.interpolate_azimuth_step.is_some(),
            "turntable_transform needs interpolate_azimuth_step"
        );
        ensure!(
            self.system_impedance > 0.0,
            "system_impedance must be positive, got {}",
            self.system_impedance
        );
        ensure!(!self.polarizations.is_empty(), "no polarization selected");
        Ok(())
    }
}
