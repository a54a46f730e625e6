use crate::error::ConfigError;
use crate::sequence::{ConditionCount, IntervalRange, validate_counts};
use glare_core::{CalibrationState, Condition, Key, PhaseKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub max_blocks: usize,
    /// Fixed seed for reproducible schedules; entropy-seeded when absent.
    pub seed: Option<u64>,
    pub skip: SkipFlags,
    /// Used only when the positioning phase is skipped.
    pub initial_calibration: Option<CalibrationState>,
    pub positioning: PositioningConfig,
    pub main: MainConfig,
    pub brightness: BrightnessConfig,
    pub afterimage: AfterimageConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            max_blocks: 30,
            seed: None,
            skip: SkipFlags::default(),
            initial_calibration: None,
            positioning: PositioningConfig::default(),
            main: MainConfig::default(),
            brightness: BrightnessConfig::default(),
            afterimage: AfterimageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipFlags {
    pub positioning: bool,
    pub main: bool,
    pub brightness: bool,
    pub afterimage: bool,
}

impl SkipFlags {
    pub fn skips(&self, phase: PhaseKind) -> bool {
        match phase {
            PhaseKind::Positioning => self.positioning,
            PhaseKind::Main => self.main,
            PhaseKind::Brightness => self.brightness,
            PhaseKind::Afterimage => self.afterimage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    pub start_x: f32,
    pub start_y: f32,
    /// Displacement per adjustment key press, in centimetres.
    pub step: f32,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            start_x: 12.0,
            start_y: 5.0,
            step: 0.25,
        }
    }
}

impl PositioningConfig {
    pub fn start(&self) -> CalibrationState {
        CalibrationState::new(self.start_x, self.start_y)
    }
}

/// Which response button reports which distractor shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonMapping {
    /// Plus = `1`, cross = `2`.
    #[default]
    PlusFirst,
    /// Cross = `1`, plus = `2`.
    CrossFirst,
}

impl ButtonMapping {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(ButtonMapping::PlusFirst),
            2 => Some(ButtonMapping::CrossFirst),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            ButtonMapping::PlusFirst => 1,
            ButtonMapping::CrossFirst => 2,
        }
    }

    pub fn key_for(&self, condition: Condition) -> Option<Key> {
        let (plus, cross) = match self {
            ButtonMapping::PlusFirst => ('1', '2'),
            ButtonMapping::CrossFirst => ('2', '1'),
        };
        match condition {
            Condition::DistractorPlus => Some(Key::Char(plus)),
            Condition::DistractorCross => Some(Key::Char(cross)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    pub counts: Vec<ConditionCount>,
    pub isi: IntervalRange,
    pub stimulus_secs: f64,
    pub button_mapping: ButtonMapping,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            counts: vec![
                ConditionCount::balanced(Condition::Glare, 8),
                ConditionCount::balanced(Condition::Nonglare, 8),
                ConditionCount::balanced(Condition::Iso, 8),
                ConditionCount::balanced(Condition::White, 8),
                ConditionCount::balanced(Condition::DistractorPlus, 4),
                ConditionCount::balanced(Condition::DistractorCross, 4),
            ],
            isi: IntervalRange::new(3, 5),
            stimulus_secs: 3.0,
            button_mapping: ButtonMapping::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    pub counts: Vec<ConditionCount>,
    pub pre_secs: u64,
    /// Phase-local mirrored layout; does not follow the calibration.
    pub layout_x: f32,
    pub layout_y: f32,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            counts: vec![
                ConditionCount::balanced(Condition::GlareVsNonglare, 10),
                ConditionCount::balanced(Condition::GlareVsIso, 10),
                ConditionCount::balanced(Condition::NonglareVsIso, 10),
            ],
            pre_secs: 2,
            layout_x: 12.0,
            layout_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoTiming {
    pub fixation_secs: f64,
    pub on_secs: f64,
    pub off_secs: f64,
}

impl Default for DemoTiming {
    fn default() -> Self {
        Self {
            fixation_secs: 1.0,
            on_secs: 4.0,
            off_secs: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterimageConfig {
    pub counts: Vec<ConditionCount>,
    pub pre_secs: u64,
    pub stimulus_secs: f64,
    /// Onset/offset report window after stimulus offset.
    pub report_secs: u64,
    pub demo: DemoTiming,
}

impl Default for AfterimageConfig {
    fn default() -> Self {
        Self {
            counts: vec![
                ConditionCount::balanced(Condition::Afterimage, 6),
                ConditionCount::balanced(Condition::Blank, 2),
            ],
            pre_secs: 2,
            stimulus_secs: 4.0,
            report_secs: 10,
            demo: DemoTiming::default(),
        }
    }
}

pub(crate) fn secs(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigError::InvalidDuration { name, value }),
    }
}

fn check_calibration(calibration: &CalibrationState) -> Result<(), ConfigError> {
    if calibration.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidCalibration {
            x: calibration.x_offset,
            y: calibration.y_offset,
        })
    }
}

impl ExperimentConfig {
    /// Checks everything that can be checked before the first block.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }

        if let Some(calibration) = &self.initial_calibration {
            check_calibration(calibration)?;
        }
        let needs_calibration = !self.skip.main || !self.skip.afterimage;
        if self.skip.positioning && needs_calibration && self.initial_calibration.is_none() {
            return Err(ConfigError::MissingCalibration);
        }

        if !self.skip.positioning {
            let step = self.positioning.step;
            if !(step.is_finite() && step > 0.0) {
                return Err(ConfigError::InvalidStep(step));
            }
            check_calibration(&self.positioning.start())?;
        }

        if !self.skip.main {
            validate_counts(&self.main.counts, PhaseKind::Main)?;
            self.main.isi.validate()?;
            secs("main.stimulus_secs", self.main.stimulus_secs)?;
        }

        if !self.skip.brightness {
            validate_counts(&self.brightness.counts, PhaseKind::Brightness)?;
            check_calibration(&CalibrationState::new(
                self.brightness.layout_x,
                self.brightness.layout_y,
            ))?;
        }

        if !self.skip.afterimage {
            let a = &self.afterimage;
            validate_counts(&a.counts, PhaseKind::Afterimage)?;
            secs("afterimage.stimulus_secs", a.stimulus_secs)?;
            secs("afterimage.demo.fixation_secs", a.demo.fixation_secs)?;
            secs("afterimage.demo.on_secs", a.demo.on_secs)?;
            secs("afterimage.demo.off_secs", a.demo.off_secs)?;
        }

        Ok(())
    }
}
