use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use glare_core::{CalibrationState, PhaseKind};
use glare_experiment::{ButtonMapping, ExperimentConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "glare-experiment",
    version,
    about = "Glare illusion perception experiment"
)]
pub struct Cli {
    /// Subject identifier, used in output file names
    #[arg(short, long)]
    pub subject: String,

    /// Session number
    #[arg(long, default_value_t = 1)]
    pub session: u32,

    /// Directory receiving the behavioral log and results file
    #[arg(short, long, default_value = "data")]
    pub output_dir: PathBuf,

    /// JSON experiment configuration; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Backend::Window)]
    pub backend: Backend,

    /// Fixed schedule seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Phases to skip (repeatable)
    #[arg(long = "skip", value_enum)]
    pub skip: Vec<PhaseArg>,

    /// Initial stimulus offset in cm, used when positioning is skipped
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    pub calibration: Option<Vec<f32>>,

    /// Response button mapping: 1 = plus on button 1, 2 = cross on button 1
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub button_mapping: Option<u8>,

    /// Display density used to convert centimetres to pixels
    #[arg(long, default_value_t = 37.8)]
    pub pixels_per_cm: f32,

    /// TrueType/OpenType font for on-screen instructions
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Text size in pixels
    #[arg(long, default_value_t = 32.0)]
    pub font_size: f32,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Key script for the headless backend (JSON list of {after_ms, key})
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Simulated refresh rate for the headless backend
    #[arg(long, default_value_t = 60.0)]
    pub frame_hz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Window,
    Headless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Positioning,
    Main,
    Brightness,
    Afterimage,
}

impl From<PhaseArg> for PhaseKind {
    fn from(p: PhaseArg) -> Self {
        match p {
            PhaseArg::Positioning => PhaseKind::Positioning,
            PhaseArg::Main => PhaseKind::Main,
            PhaseArg::Brightness => PhaseKind::Brightness,
            PhaseArg::Afterimage => PhaseKind::Afterimage,
        }
    }
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ExperimentConfig::default(),
        };

        if self.seed.is_some() {
            config.seed = self.seed;
        }
        for phase in &self.skip {
            match PhaseKind::from(*phase) {
                PhaseKind::Positioning => config.skip.positioning = true,
                PhaseKind::Main => config.skip.main = true,
                PhaseKind::Brightness => config.skip.brightness = true,
                PhaseKind::Afterimage => config.skip.afterimage = true,
            }
        }
        if let Some(xy) = &self.calibration {
            let [x, y] = xy[..] else {
                bail!("--calibration takes exactly two values");
            };
            config.initial_calibration = Some(CalibrationState::new(x, y));
        }
        if let Some(n) = self.button_mapping {
            config.main.button_mapping = ButtonMapping::from_number(n)
                .with_context(|| format!("unknown button mapping {n}"))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn overrides_apply_on_top_of_the_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_blocks": 4, "seed": 1 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let cli = Cli::try_parse_from([
            "glare-experiment",
            "--subject",
            "S01",
            "--config",
            &path,
            "--seed",
            "9",
            "--skip",
            "positioning",
            "--skip",
            "brightness",
            "--calibration",
            "11.5",
            "-2",
            "--button-mapping",
            "2",
        ])
        .unwrap();
        let config = cli.experiment_config().unwrap();

        assert_eq!(config.max_blocks, 4);
        assert_eq!(config.seed, Some(9));
        assert!(config.skip.positioning && config.skip.brightness && !config.skip.main);
        assert_eq!(
            config.initial_calibration,
            Some(CalibrationState::new(11.5, -2.0))
        );
        assert_eq!(config.main.button_mapping, ButtonMapping::CrossFirst);
    }

    #[test]
    fn button_mapping_outside_range_is_rejected() {
        let parsed = Cli::try_parse_from([
            "glare-experiment",
            "-s",
            "S01",
            "--button-mapping",
            "3",
        ]);
        assert!(parsed.is_err());
    }
}
