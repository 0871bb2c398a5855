//! The end-to-end computation.
//!
//! Normalizing → Validating → Integrating → Verifying → Evaluating, each stage fed only
//! by a successful previous one. A `Pipeline` records the stage it is in, so after a run
//! its stage is either `Succeeded` or `Failed(kind)`. Nothing carries over between runs.
use crate::Utils::logger::init_logger;
use crate::potential::error::{Component, ErrorKind, Failure, Locale, PotentialError};
use crate::potential::evaluator::{FieldValues, evaluate};
use crate::potential::normalizer::normalize;
use crate::potential::reconstructor::{ReconstructionStrategy, reconstruct};
use crate::potential::validator::{CoordinateSymbols, parse_and_validate};
use crate::potential::verifier::{VerifiedPotential, verify};
use log::{debug, error, info, warn};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::Once;
use std::time::Instant;

thread_local! {
    /// set while a guarded run is active on this thread
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}
static PANIC_HOOK: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Normalizing,
    Validating,
    Integrating,
    Verifying,
    Evaluating,
    Succeeded,
    Failed(ErrorKind),
}

/// Knobs of a computation. The grid is not among them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeSettings {
    pub strategy: ReconstructionStrategy,
    pub locale: Locale,
    /// "debug", "info", "warn", "error" or "off"; `None` leaves logging alone
    pub loglevel: Option<String>,
    /// also write the log to a timestamped file
    pub log_to_file: bool,
}

/// Successful result: the verified potential and its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialSolution {
    pub potential: VerifiedPotential,
    pub field: FieldValues,
}

pub struct Pipeline {
    settings: ComputeSettings,
    coords: CoordinateSymbols,
    stage: PipelineStage,
}

impl Pipeline {
    pub fn new(settings: ComputeSettings) -> Self {
        Pipeline {
            settings,
            coords: CoordinateSymbols::default(),
            stage: PipelineStage::Idle,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn settings(&self) -> &ComputeSettings {
        &self.settings
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Runs all stages on the two raw component texts.
    pub fn run(&mut self, fx_text: &str, fy_text: &str) -> Result<PotentialSolution, PotentialError> {
        self.stage = PipelineStage::Idle;
        let result = self.run_stages(fx_text, fy_text);
        match &result {
            Ok(solution) => {
                self.enter(PipelineStage::Succeeded);
                info!(
                    "U(x, y) = {}, range [{}, {}]",
                    solution.potential.expr(),
                    solution.field.min(),
                    solution.field.max()
                );
            }
            Err(err) => {
                self.enter(PipelineStage::Failed(err.kind()));
                warn!("{}: {}", err.kind(), err);
            }
        }
        result
    }

    fn run_stages(&mut self, fx_text: &str, fy_text: &str) -> Result<PotentialSolution, PotentialError> {
        self.enter(PipelineStage::Normalizing);
        let fx_text = normalize(fx_text);
        let fy_text = normalize(fy_text);

        self.enter(PipelineStage::Validating);
        let fx = parse_and_validate(&fx_text, &self.coords, Component::Fx)?;
        let fy = parse_and_validate(&fy_text, &self.coords, Component::Fy)?;

        self.enter(PipelineStage::Integrating);
        let candidate = reconstruct(&fx, &fy, &self.coords, self.settings.strategy)?;

        self.enter(PipelineStage::Verifying);
        let potential = verify(&candidate, &fx, &fy, &self.coords)?;

        self.enter(PipelineStage::Evaluating);
        let field = evaluate(&potential, &self.coords)?;
        Ok(PotentialSolution { potential, field })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wraps the current panic hook once, so that panics inside a guarded run are not printed;
/// every other panic still reaches the previous hook.
fn install_quiet_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET_PANICS.get() {
                previous(info);
            }
        }));
    });
}

/// Runs `f`, turning a panic into `Unexpected`. The panic is reported once, through the log.
fn run_guarded<T>(f: impl FnOnce() -> Result<T, PotentialError>) -> Result<T, PotentialError> {
    install_quiet_hook();
    let outer = QUIET_PANICS.replace(true);
    let outcome = catch_unwind(AssertUnwindSafe(f));
    QUIET_PANICS.set(outer);
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload);
            error!("computation panicked: {}", message);
            Err(PotentialError::Unexpected(message))
        }
    }
}

/// Like [`compute`], with explicit settings. Panics inside the stages come back as
/// `UnexpectedError`.
pub fn compute_with_settings(
    fx_text: &str,
    fy_text: &str,
    settings: &ComputeSettings,
) -> Result<PotentialSolution, Failure> {
    if settings.loglevel.is_some() {
        // a logger installed earlier stays in charge
        if let Err(err) = init_logger(settings.loglevel.as_deref(), settings.log_to_file) {
            debug!("logger not initialised: {}", err);
        }
    }
    let begin = Instant::now();
    let mut pipeline = Pipeline::new(settings.clone());
    let result = run_guarded(|| pipeline.run(fx_text, fy_text));
    info!("computation took {:?}", begin.elapsed());
    result.map_err(|err| err.to_failure(settings.locale))
}

/// Reconstructs the potential of the force field (`fx_text`, `fy_text`) and samples it on the
/// 400 × 400 grid over [-10, 10]².
///
/// ```
/// use RustedPotential::potential::compute;
/// let solution = compute("-x", "-y").unwrap();
/// assert_eq!(solution.field.shape(), (400, 400));
/// assert_eq!(solution.potential.value_at(10.0, 0.0).unwrap(), 50.0);
/// ```
pub fn compute(fx_text: &str, fy_text: &str) -> Result<PotentialSolution, Failure> {
    compute_with_settings(fx_text, fy_text, &ComputeSettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_after_success() {
        let mut pipeline = Pipeline::new(ComputeSettings::default());
        assert_eq!(pipeline.stage(), PipelineStage::Idle);
        assert!(pipeline.run("2*x", "3").is_ok());
        assert_eq!(pipeline.stage(), PipelineStage::Succeeded);
    }

    #[test]
    fn test_stage_after_failure() {
        let mut pipeline = Pipeline::new(ComputeSettings::default());
        let cases = [
            (("x+*", "0"), ErrorKind::ParseError),
            (("z", "0"), ErrorKind::UndeclaredVariableError),
            (("exp(-x^2)", "0"), ErrorKind::IntegrationError),
            (("y", "y"), ErrorKind::InconsistentFieldError),
            (("sqrt(-1)", "0"), ErrorKind::ComplexResultError),
            (("1/x", "0"), ErrorKind::NonFiniteResultError),
        ];
        for ((fx, fy), kind) in cases {
            let err = pipeline.run(fx, fy).unwrap_err();
            assert_eq!(err.kind(), kind, "({}, {})", fx, fy);
            assert_eq!(pipeline.stage(), PipelineStage::Failed(kind));
        }
    }

    #[test]
    fn test_fy_is_validated_after_fx() {
        let err = Pipeline::new(ComputeSettings::default())
            .run("x", "y + w")
            .unwrap_err();
        assert_eq!(
            err,
            PotentialError::UndeclaredVariables {
                component: Component::Fy,
                names: vec!["w".to_string()]
            }
        );
    }

    #[test]
    fn test_panic_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(17_u8)), "unknown panic");
    }

    #[test]
    fn test_panic_becomes_unexpected_error() {
        let result: Result<(), PotentialError> = run_guarded(|| panic!("boom"));
        assert_eq!(result, Err(PotentialError::Unexpected("boom".to_string())));
        assert!(!QUIET_PANICS.get());
        let result: Result<u8, PotentialError> = run_guarded(|| Ok(3));
        assert_eq!(result, Ok(3));
        assert!(!QUIET_PANICS.get());
    }

    #[test]
    fn test_localized_failure() {
        let settings = ComputeSettings {
            locale: Locale::Ru,
            ..ComputeSettings::default()
        };
        let failure = compute_with_settings("y", "y", &settings).unwrap_err();
        assert_eq!(failure.kind, ErrorKind::InconsistentFieldError);
        assert_eq!(failure.message, "Интегрирование по x дало некорректный результат.");
    }
}
