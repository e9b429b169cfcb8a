use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use patterncore::formats::{parse_file, parse_str, PatternDataset};
use patterncore::grid::{GainGrid, PatternSummary};
use patterncore::prelude::GainKey;
use patterncore::transform::{
    add_sum_channels, retain_channels, turntable_to_spherical, AzimuthResampler,
};
use patterncore::VswrSweep;

use crate::report::model::{ChannelModel, GeometryModel, GridModel, PatternReport};
use crate::workflow::config::PipelineConfig;

pub struct Runner {
    config: PipelineConfig,
}

impl Runner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn execute_file(&self, path: &Path) -> anyhow::Result<PatternReport> {
        let dataset = parse_file(path, &self.config.parse)
            .with_context(|| format!("parsing {}", path.display()))?;
        self.build_report(path.display().to_string(), dataset)
    }

    pub fn execute_text(&self, source: &str, text: &str) -> anyhow::Result<PatternReport> {
        let dataset = parse_str(text, &self.config.parse)
            .with_context(|| format!("parsing {}", source))?;
        self.build_report(source.to_string(), dataset)
    }

    fn build_report(
        &self,
        source: String,
        mut dataset: PatternDataset,
    ) -> anyhow::Result<PatternReport> {
        let added = add_sum_channels(&mut dataset.patterns).context("combining polarizations")?;
        if added > 0 {
            info!("derived {} sum channel(s)", added);
        }
        retain_channels(&mut dataset.patterns, &self.config.polarizations);
        anyhow::ensure!(
            !dataset.patterns.is_empty(),
            "{} holds no pattern for polarization(s) {:?}",
            source,
            self.config.polarizations
        );

        if let Some(step) = self.config.interpolate_azimuth_step {
            let resampler = AzimuthResampler::new(step).context("building azimuth resampler")?;
            for pattern in dataset.patterns.values_mut() {
                *pattern = resampler.resample(pattern);
            }
        }

        let mut grids = dataset.compile().context("compiling gain grids")?;
        if self.config.turntable_transform {
            grids = grids
                .into_iter()
                .map(|(key, grid)| {
                    turntable_to_spherical(&grid)
                        .map(|grid| (key, grid))
                        .with_context(|| format!("re-indexing turntable grid {}", key))
                })
                .collect::<anyhow::Result<BTreeMap<GainKey, GainGrid>>>()?;
        }

        let summary = PatternSummary::from_grids(grids.values()).context("summarizing grids")?;
        let channels = grids
            .values()
            .map(|grid| self.channel_model(&summary, grid))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let vswr = if dataset.impedances.is_empty() {
            None
        } else {
            Some(
                VswrSweep::from_impedances(&dataset.impedances, self.config.system_impedance)
                    .context("computing VSWR")?,
            )
        };
        let best_match_frequency = vswr.as_ref().and_then(VswrSweep::min_vswr_frequency);

        let geometry = (!dataset.geometry.is_empty()).then(|| GeometryModel {
            structures: dataset.geometry.structures(),
            loaded: dataset.geometry.loaded.clone(),
            has_ground: dataset.geometry.has_ground,
        });

        info!(
            "{}: {} grid(s), max gain {:.2} dB",
            source,
            channels.len(),
            summary.max_gain
        );
        Ok(PatternReport {
            source,
            dialect: dataset.dialect,
            level_unit: dataset.level_unit,
            scaling: self.config.scaling.title().to_string(),
            metrics: dataset.metrics,
            summary,
            channels,
            vswr,
            best_match_frequency,
            geometry,
        })
    }

    fn channel_model(
        &self,
        summary: &PatternSummary,
        grid: &GainGrid,
    ) -> anyhow::Result<ChannelModel> {
        let key = grid.key();
        let reference =
            summary.reference(grid, self.config.angle_azimuth, self.config.angle_elevation);
        let azimuth_cut = grid
            .azimuth_cut(reference.theta_idx)
            .with_context(|| format!("azimuth cut of {}", key))?;
        let elevation_cut = if grid.phis().len() < 2 {
            warn!("{} holds a single azimuth, no elevation cut", key);
            None
        } else {
            Some(
                grid.elevation_cut(reference.phi_idx)
                    .with_context(|| format!("elevation cut of {}", key))?,
            )
        };

        let scaling = self.config.scaling;
        Ok(ChannelModel {
            frequency: key.frequency.mhz(),
            polarization: key.polarization.code().to_string(),
            theta_count: grid.thetas().len(),
            phi_count: grid.phis().len(),
            max_gain: grid.max_gain(),
            theta_at_max: grid.theta_at_max(),
            phi_at_max: grid.phi_at_max(),
            reference,
            azimuth_radii: scaling.scale_points(summary.max_gain, &azimuth_cut),
            elevation_radii: elevation_cut
                .as_ref()
                .map(|cut| scaling.scale_points(summary.max_gain, cut)),
            azimuth_cut,
            elevation_cut,
            grid: self.config.include_grids.then(|| GridModel::from_grid(grid)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patterncore::prelude::Polarization;

    fn basic_dump() -> String {
        let mut text = String::from("ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D\n");
        for theta in (0..=180).step_by(30) {
            for phi in (0..=360).step_by(30) {
                let total = if theta == 90 && phi == 180 { 5.0 } else { -10.0 };
                text.push_str(&format!("{},{},-20,-20,{}\n", theta, phi, total));
            }
        }
        text.push('\n');
        text
    }

    #[test]
    fn runner_reports_the_peak_of_a_basic_dump() {
        let runner = Runner::new(PipelineConfig::default());
        let report = runner.execute_text("dump", &basic_dump()).unwrap();
        assert_eq!(report.channels.len(), 1);
        let sum = report.channel(0.0, "sum").unwrap();
        assert_eq!(sum.max_gain, 5.0);
        assert_eq!((sum.theta_at_max, sum.phi_at_max), (90.0, 180.0));
        assert_eq!(sum.reference.theta_idx, 3);
        assert_eq!(sum.reference.phi_idx, 6);
        assert_eq!(sum.azimuth_cut.len(), 13);
        assert_eq!(sum.azimuth_radii.iter().cloned().fold(0.0, f64::max), 1.0);
        assert!(sum.elevation_cut.is_some());
        assert!(sum.grid.is_none());
        assert!(report.vswr.is_none());
    }

    #[test]
    fn runner_keeps_requested_polarizations() {
        let config = PipelineConfig {
            polarizations: vec![Polarization::Horizontal, Polarization::Vertical],
            include_grids: true,
            ..PipelineConfig::default()
        };
        let report = Runner::new(config).execute_text("dump", &basic_dump()).unwrap();
        assert_eq!(report.channels.len(), 2);
        let h = report.channel(0.0, "H").unwrap();
        let grid = h.grid.as_ref().unwrap();
        assert_eq!(grid.thetas.len(), 7);
        assert_eq!(grid.phis.len(), 13);
    }

    #[test]
    fn runner_computes_vswr_from_impedances() {
        let text = "\
FREQUENCY : 7.0 MHZ
IMPEDANCE = (50.0 , 0.0 J)
FREQUENCY : 7.1 MHZ
IMPEDANCE = (75.0 , 10.0 J)
ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D
0,0,1,2,3
90,0,1,2,3

";
        let report = Runner::new(PipelineConfig::default())
            .execute_text("nec", text)
            .unwrap();
        let sweep = report.vswr.unwrap();
        assert_eq!(sweep.points.len(), 2);
        assert_eq!(report.best_match_frequency, Some(7.0));
    }

    #[test]
    fn runner_rejects_empty_selection() {
        let text = "ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D\n\n";
        assert!(Runner::new(PipelineConfig::default())
            .execute_text("empty", text)
            .is_err());
    }
}
