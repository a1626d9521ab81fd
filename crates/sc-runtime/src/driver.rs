use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sc_core::{Event, Interpreter};
use tracing::{debug, warn};

use crate::error::DriverError;

/// Commands the driver thread accepts over its channel. All interaction
/// with the interpreter while the driver owns it goes through these, never
/// by reaching into the interpreter directly — it lives on another thread.
enum Command {
    Send(Event),
    Stop,
}

/// Runs an [`Interpreter`] on a background OS thread, driven by its own
/// synchronized [`sc_core::Clock`] rather than by a caller-supplied polling
/// loop, mirroring the reference's `run_in_background`: `execute()` is
/// called repeatedly with the clock tracking wall time, on a fixed
/// `poll_interval`, until the interpreter has nothing left to do or
/// [`BackgroundDriver::stop`] is called.
///
/// Unlike the reference, which mutates `interpreter._configuration`
/// directly from the caller's thread to force a stop, this hands the
/// interpreter to the background thread entirely: the only way back in is
/// [`Self::send`] (queue an event) or [`Self::stop`] (ask the thread to
/// exit). There is no direct reference to the interpreter available while
/// the driver is running.
pub struct BackgroundDriver {
    commands: mpsc::Sender<Command>,
    handle: Option<JoinHandle<Interpreter>>,
}

impl BackgroundDriver {
    /// Spawn the driver thread. `interpreter`'s clock is switched to
    /// synchronized playback and started; the thread calls `execute(0)`
    /// every `poll_interval` until the interpreter stops running or
    /// [`Self::stop`] is called.
    pub fn spawn(mut interpreter: Interpreter, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        interpreter.clock_mut().start();

        let handle = thread::spawn(move || {
            'drive: loop {
                match rx.recv_timeout(poll_interval) {
                    Ok(Command::Send(event)) => {
                        interpreter.send(event);
                    }
                    Ok(Command::Stop) => break 'drive,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => break 'drive,
                }

                match interpreter.execute(0) {
                    Ok(steps) if !steps.is_empty() => debug!(count = steps.len(), "driver ran macro-steps"),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "driver's interpreter failed a macro-step, stopping");
                        break 'drive;
                    }
                }

                if !interpreter.running() {
                    break 'drive;
                }
            }
            interpreter
        });

        Self { commands: tx, handle: Some(handle) }
    }

    /// Queue an event for the driven interpreter's next poll.
    pub fn send(&self, event: Event) -> Result<(), DriverError> {
        self.commands.send(Command::Send(event)).map_err(|_| DriverError::Stopped)
    }

    /// Ask the driver thread to exit and return the interpreter it was
    /// driving, in whatever configuration it had reached.
    pub fn stop(mut self) -> Result<Interpreter, DriverError> {
        let _ = self.commands.send(Command::Stop);
        self.join()
    }

    fn join(&mut self) -> Result<Interpreter, DriverError> {
        self.handle.take().ok_or(DriverError::Stopped)?.join().map_err(|_| DriverError::Stopped)
    }
}

impl Drop for BackgroundDriver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.commands.send(Command::Stop);
            let _ = self.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sc_core::{EvalContext, EvalError, Evaluator, Subject};
    use sc_model::{State, StateKind, Statechart, Transition};

    use super::*;

    struct NoOp;

    impl Evaluator for NoOp {
        fn execute_preamble(&mut self, _: Option<&str>, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), EvalError> {
            Ok(())
        }
        fn execute_onentry(&mut self, _: &State, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), EvalError> {
            Ok(())
        }
        fn execute_onexit(&mut self, _: &State, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), EvalError> {
            Ok(())
        }
        fn execute_action(&mut self, _: usize, _: &Transition, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), EvalError> {
            Ok(())
        }
        fn evaluate_guard(&mut self, _: usize, _: &Transition, _: &EvalContext<'_>) -> Result<bool, EvalError> {
            Ok(true)
        }
        fn evaluate_preconditions(&mut self, _: Subject<'_>, _: &[String], _: &EvalContext<'_>) -> Result<Vec<String>, EvalError> {
            Ok(Vec::new())
        }
        fn evaluate_invariants(&mut self, _: Subject<'_>, _: &[String], _: &EvalContext<'_>) -> Result<Vec<String>, EvalError> {
            Ok(Vec::new())
        }
        fn evaluate_postconditions(&mut self, _: Subject<'_>, _: &[String], _: &EvalContext<'_>) -> Result<Vec<String>, EvalError> {
            Ok(Vec::new())
        }
        fn context_snapshot(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
    }

    fn atomic(name: &str) -> State {
        State::new(name, StateKind::Atomic)
    }

    fn compound(name: &str, children: &[&str], initial: &str) -> State {
        State::new(
            name,
            StateKind::Compound { children: children.iter().map(|s| s.to_string()).collect(), initial: initial.to_string() },
        )
    }

    fn door() -> Interpreter {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["closed", "open"], "closed"), atomic("closed"), atomic("open")],
            vec![Transition::new("closed").to("open").on("knock")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        Interpreter::new(sc, Box::new(|| Box::new(NoOp)), false).unwrap()
    }

    #[test]
    fn driver_consumes_events_sent_from_another_thread() {
        let driver = BackgroundDriver::spawn(door(), Duration::from_millis(5));
        driver.send(Event::new("knock")).unwrap();
        thread::sleep(Duration::from_millis(50));
        let interpreter = driver.stop().unwrap();
        assert!(interpreter.configuration().contains(&"open".to_string()));
    }

    #[test]
    fn stop_returns_the_interpreter_even_with_no_events_sent() {
        let driver = BackgroundDriver::spawn(door(), Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        let interpreter = driver.stop().unwrap();
        assert!(interpreter.configuration().contains(&"closed".to_string()));
    }
}
