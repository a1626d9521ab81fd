use sc_core::StepError;

/// Everything that can stop the tester harness or the background driver.
///
/// `Tested`/`Tester` both wrap a [`StepError`] from the underlying
/// interpreter; they're kept distinct so callers can tell at a glance
/// whether the system under test or one of the tester statecharts is at
/// fault, mirroring the reference's `ConditionFailed(..., obj=tester, ...)`
/// distinction without needing a dynamic `obj` field.
#[derive(Debug, thiserror::Error)]
pub enum TesterError {
    #[error("tested interpreter failed: {0}")]
    Tested(#[source] StepError),

    #[error("tester '{tester}' rejected the step: {source}")]
    Tester {
        tester: String,
        #[source]
        source: StepError,
    },
}

/// Errors raised by [`crate::driver::BackgroundDriver`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("interpreter step failed: {0}")]
    Step(#[from] StepError),

    #[error("the driver thread has already shut down")]
    Stopped,
}
