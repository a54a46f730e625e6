use crate::block::BlockController;
use crate::config::ExperimentConfig;
use crate::error::{ConfigError, Result};
use crate::phases::{afterimage, brightness, main_task, positioning};
use crate::sequence::SequenceGenerator;
use crate::session::{Collaborators, Session};
use glare_core::{BlockSummary, CalibrationState, Key, Phase, PhaseKind};
use serde::{Deserialize, Serialize};
use tracing::info;

const SETUP_TEXT: &str = "Welcome, and thank you for taking part.\n\n\
    Please keep your head still and your eyes on the central dot.\n\n\
    Press SPACE to continue.";

const END_TEXT: &str = "The experiment is complete.\n\nThank you for your participation!";

/// Everything a run produced, kept even when the run ends early.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub calibration: Option<CalibrationState>,
    pub phases_run: Vec<PhaseKind>,
    pub summaries: Vec<BlockSummary>,
}

pub struct Experiment {
    config: ExperimentConfig,
    session: Session,
    controller: BlockController,
    report: RunReport,
}

impl Experiment {
    /// Validates the whole configuration before anything is shown.
    pub fn new(config: ExperimentConfig, collab: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = match config.seed {
            Some(seed) => SequenceGenerator::from_seed(seed),
            None => SequenceGenerator::from_entropy(),
        };
        let controller = BlockController::new(generator, config.max_blocks);
        Ok(Self {
            session: Session::new(collab),
            controller,
            config,
            report: RunReport::default(),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Results gathered so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Runs every enabled phase in order. Teardown always happens, whether
    /// the run completes, is aborted or fails.
    pub fn run(&mut self) -> Result<RunReport> {
        let result = self.run_phases();
        let teardown = self.session.teardown();
        result?;
        teardown?;
        Ok(self.report.clone())
    }

    fn run_phases(&mut self) -> Result<()> {
        self.session.event("Start Experiment")?;
        self.session.instruction(SETUP_TEXT)?;
        self.key_check()?;

        let mut calibration = self
            .config
            .initial_calibration
            .unwrap_or_else(|| self.config.positioning.start());

        let mut next = Some(PhaseKind::default());
        while let Some(phase) = next {
            next = phase.next();
            if self.config.skip.skips(phase) {
                info!("skipping {}", phase.label());
                if phase == PhaseKind::Positioning {
                    self.session.event("Positioning skipped, using configured calibration")?;
                    positioning::log_final(&mut self.session, &calibration)?;
                    self.report.calibration = Some(calibration);
                }
                continue;
            }

            self.session.start_recording()?;
            self.session.event(&format!("Starting {}", phase.label()))?;
            match phase {
                PhaseKind::Positioning => {
                    calibration =
                        positioning::run(&mut self.session, &self.config.positioning, calibration)?;
                }
                PhaseKind::Main => main_task::run(
                    &mut self.session,
                    &mut self.controller,
                    &self.config.main,
                    &self.config.positioning,
                    &mut calibration,
                    &mut self.report.summaries,
                )?,
                PhaseKind::Brightness => brightness::run(
                    &mut self.session,
                    &mut self.controller,
                    &self.config.brightness,
                    &mut self.report.summaries,
                )?,
                PhaseKind::Afterimage => afterimage::run(
                    &mut self.session,
                    &mut self.controller,
                    &self.config.afterimage,
                    &mut calibration,
                    &mut self.report.summaries,
                )?,
            }
            if phase.uses_calibration() || !phase.runs_blocks() {
                self.report.calibration = Some(calibration);
            }
            self.report.phases_run.push(phase);
            self.session.event(&format!("Finished {}", phase.label()))?;
            self.session.stop_recording()?;
            self.session.report_frame_stats(phase.label())?;
        }

        self.session.event("Experiment complete")?;
        self.session.instruction(END_TEXT)
    }

    /// Confirms the response buttons work before any phase starts.
    fn key_check(&mut self) -> Result<()> {
        for c in ['1', '2', '3'] {
            self.session
                .message(Some(&format!("Key check: please press button {c}.")));
            self.session.clear_input()?;
            self.session.wait_for_keys(&[Key::Char(c)])?;
        }
        self.session.message(None);
        self.session.event("Key check complete")
    }
}
