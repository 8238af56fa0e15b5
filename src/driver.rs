use std::fmt;

use log::{debug, trace};

use crate::buffers::InputBuffer;
use crate::err::{BenchError, LifecycleError, Result};
use crate::settings::CodecSettings;
use crate::suite::TestCase;

/// Where a driver instance stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Prepared,
    Running,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initialized => "initialized",
            Phase::Prepared => "prepared",
            Phase::Running => "running",
            Phase::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// One measured subject.
///
/// `initialize` binds the codec settings, `prepare` moves everything the
/// timed phase needs into memory, `run` is the measured unit of work and
/// `finish` writes size results back onto the case. Implementations stay
/// free of ordering checks; [`Lifecycle`] enforces those.
pub trait Driver {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, settings: &CodecSettings) -> Result<()>;

    fn prepare(&mut self, case: &TestCase) -> Result<()>;

    fn run(&mut self, case: &TestCase) -> Result<()>;

    fn finish(&mut self, case: &mut TestCase) -> Result<()>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn initialize(&mut self, settings: &CodecSettings) -> Result<()> {
        (**self).initialize(settings)
    }

    fn prepare(&mut self, case: &TestCase) -> Result<()> {
        (**self).prepare(case)
    }

    fn run(&mut self, case: &TestCase) -> Result<()> {
        (**self).run(case)
    }

    fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        (**self).finish(case)
    }
}

/// Wraps a driver with the phase machine.
///
/// Operations called out of order fail without reaching the driver. Once
/// any operation fails, the instance is poisoned: every later call reports
/// that, so a half-built state can never be timed.
pub struct Lifecycle<D> {
    driver: D,
    phase: Phase,
    poisoned: bool,
}

impl<D: Driver> Lifecycle<D> {
    pub fn new(driver: D) -> Self {
        Lifecycle {
            driver,
            phase: Phase::Uninitialized,
            poisoned: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.driver.name()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    fn allow(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        if self.poisoned {
            return Err(LifecycleError::Poisoned {
                driver: self.name().to_string(),
            }
            .into());
        }
        if !allowed.contains(&self.phase) {
            return Err(LifecycleError::OutOfOrder {
                driver: self.name().to_string(),
                operation,
                phase: self.phase,
            }
            .into());
        }
        Ok(())
    }

    fn advance<F>(&mut self, next: Phase, op: F) -> Result<()>
    where
        F: FnOnce(&mut D) -> Result<()>,
    {
        match op(&mut self.driver) {
            Ok(()) => {
                self.phase = next;
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    pub fn initialize(&mut self, settings: &CodecSettings) -> Result<()> {
        if self.poisoned {
            return Err(LifecycleError::Poisoned {
                driver: self.name().to_string(),
            }
            .into());
        }
        if self.phase != Phase::Uninitialized {
            return Err(LifecycleError::DoubleInitialize {
                driver: self.name().to_string(),
            }
            .into());
        }
        debug!("driver `{}`: initialize", self.name());
        self.advance(Phase::Initialized, |driver| driver.initialize(settings))
    }

    /// Loads a test case. Accepted after `initialize` or after the previous
    /// case was finished; an in-flight case must go through `finish` before
    /// a new `prepare` is accepted.
    pub fn prepare(&mut self, case: &TestCase) -> Result<()> {
        self.allow("prepare", &[Phase::Initialized, Phase::Finished])?;
        debug!("driver `{}`: prepare test case `{}`", self.name(), case.name());
        self.advance(Phase::Prepared, |driver| driver.prepare(case))
    }

    pub fn run(&mut self, case: &TestCase) -> Result<()> {
        self.allow("run", &[Phase::Prepared, Phase::Running])?;
        trace!("driver `{}`: run test case `{}`", self.name(), case.name());
        self.advance(Phase::Running, |driver| driver.run(case))
    }

    pub fn finish(&mut self, case: &mut TestCase) -> Result<()> {
        self.allow("finish", &[Phase::Prepared, Phase::Running])?;
        debug!("driver `{}`: finish test case `{}`", self.name(), case.name());
        self.advance(Phase::Finished, |driver| driver.finish(case))
    }
}

/// Loads a case input and refuses empty payloads, which would make every
/// timed iteration a no-op.
pub(crate) fn load_case_input(case: &TestCase) -> Result<InputBuffer> {
    let input = InputBuffer::load(case.input_path())?;
    if input.is_empty() {
        return Err(LifecycleError::EmptyInput {
            path: case.input_path().to_owned(),
        }
        .into());
    }
    Ok(input)
}

/// Ordering error for drivers invoked directly, without the [`Lifecycle`]
/// wrapper, when an earlier operation has not left them the state they need.
pub(crate) fn out_of_order(driver: &str, operation: &'static str, phase: Phase) -> BenchError {
    LifecycleError::OutOfOrder {
        driver: driver.to_string(),
        operation,
        phase,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn failing_on(operation: &'static str) -> Self {
            Recorder {
                calls: Vec::new(),
                fail_on: Some(operation),
            }
        }

        fn record(&mut self, operation: &'static str) -> Result<()> {
            self.calls.push(operation);
            if self.fail_on == Some(operation) {
                return Err(LifecycleError::EmptyInput {
                    path: "test.xml".into(),
                }
                .into());
            }
            Ok(())
        }
    }

    impl Driver for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn initialize(&mut self, _settings: &CodecSettings) -> Result<()> {
            self.record("initialize")
        }

        fn prepare(&mut self, _case: &TestCase) -> Result<()> {
            self.record("prepare")
        }

        fn run(&mut self, _case: &TestCase) -> Result<()> {
            self.record("run")
        }

        fn finish(&mut self, _case: &mut TestCase) -> Result<()> {
            self.record("finish")
        }
    }

    fn case() -> TestCase {
        TestCase::new("case", "case.xml", Params::new())
    }

    #[test]
    fn the_full_lifecycle_in_order() {
        let mut lifecycle = Lifecycle::new(Recorder::default());
        let mut case = case();

        lifecycle.initialize(&CodecSettings::default()).unwrap();
        lifecycle.prepare(&case).unwrap();
        lifecycle.run(&case).unwrap();
        lifecycle.run(&case).unwrap();
        lifecycle.finish(&mut case).unwrap();
        assert_eq!(lifecycle.phase(), Phase::Finished);

        // A finished driver accepts the next case without re-initializing.
        lifecycle.prepare(&case).unwrap();
        assert_eq!(
            lifecycle.into_inner().calls,
            vec!["initialize", "prepare", "run", "run", "finish", "prepare"]
        );
    }

    #[test]
    fn run_before_prepare_is_rejected() {
        let mut lifecycle = Lifecycle::new(Recorder::default());
        lifecycle.initialize(&CodecSettings::default()).unwrap();

        let err = lifecycle.run(&case()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Lifecycle(LifecycleError::OutOfOrder {
                operation: "run",
                phase: Phase::Initialized,
                ..
            })
        ));
        // The driver itself was never consulted.
        assert_eq!(lifecycle.into_inner().calls, vec!["initialize"]);
    }

    #[test]
    fn initializing_twice_is_rejected() {
        let mut lifecycle = Lifecycle::new(Recorder::default());
        lifecycle.initialize(&CodecSettings::default()).unwrap();

        let err = lifecycle.initialize(&CodecSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Lifecycle(LifecycleError::DoubleInitialize { .. })
        ));
    }

    #[test]
    fn a_failed_operation_poisons_the_instance() {
        let mut lifecycle = Lifecycle::new(Recorder::failing_on("prepare"));
        lifecycle.initialize(&CodecSettings::default()).unwrap();
        assert!(lifecycle.prepare(&case()).is_err());
        assert!(lifecycle.is_poisoned());

        let err = lifecycle.run(&case()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Lifecycle(LifecycleError::Poisoned { .. })
        ));
        let err = lifecycle.initialize(&CodecSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Lifecycle(LifecycleError::Poisoned { .. })
        ));
    }

    #[test]
    fn finish_directly_after_prepare_is_allowed() {
        let mut lifecycle = Lifecycle::new(Recorder::default());
        let mut case = case();
        lifecycle.initialize(&CodecSettings::default()).unwrap();
        lifecycle.prepare(&case).unwrap();
        lifecycle.finish(&mut case).unwrap();
        assert_eq!(lifecycle.phase(), Phase::Finished);
    }
}
