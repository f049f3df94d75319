// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! One-shot parallel fan-out of work across named threads.

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use log::error;

////////////////////////////////////////////////////////////////////////
// FAN-OUT                                                            //
////////////////////////////////////////////////////////////////////////

/// Runs `task` once for each index in `0..count`, in parallel, and
/// returns the results in index order.
///
/// Each invocation runs on its own scoped thread named `"{name} {i}"`.
/// Every thread that was started is joined before this returns, so the
/// caller sees a complete picture: a thread that could not be started
/// yields [`Error::Spawn`] and one that panicked yields
/// [`Error::Panicked`], without affecting the other results.
///
/// When `count` is 1, the task runs directly on the calling thread
/// instead. A panic is still reported as [`Error::Panicked`].
pub fn fan_out<T, F>(name: &str, count: usize, task: F) -> Vec<Result<T, Error>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    if count == 1 {
        let result = panic::catch_unwind(AssertUnwindSafe(|| task(0))).map_err(|_| {
            error!("Task {} panicked", name);
            Error::Panicked
        });
        return vec![result];
    }

    let task = &task;
    thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|i| {
                thread::Builder::new()
                    .name(format!("{} {}", name, i))
                    .spawn_scoped(scope, move || task(i))
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(i, handle)| match handle {
                Ok(handle) => handle.join().map_err(|_| {
                    error!("Thread {} {} panicked", name, i);
                    Error::Panicked
                }),
                Err(e) => Err(e.into()),
            })
            .collect()
    })
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error type for a single task run by [`fan_out`].
#[derive(Debug)]
pub enum Error {
    /// An OS-level error occurred during the creation of the thread.
    Spawn(io::Error),

    /// The thread panicked.
    Panicked,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Spawn(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to start thread: {}", err),
            Self::Panicked => f.write_str("thread panicked"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Panicked => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn results_come_back_in_index_order() {
        let results = fan_out("test", 4, |i| i * 10);
        let values: Vec<usize> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, [0, 10, 20, 30]);
    }

    #[test]
    fn single_task_runs_on_calling_thread() {
        let caller = thread::current().id();
        let results = fan_out("test", 1, |_| thread::current().id());
        assert_eq!(results.into_iter().next().unwrap().unwrap(), caller);
    }

    #[test]
    fn threads_are_named() {
        let results = fan_out("signer", 2, |_| {
            thread::current().name().map(ToOwned::to_owned)
        });
        let names: Vec<Option<String>> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            names,
            [Some("signer 0".to_owned()), Some("signer 1".to_owned())]
        );
    }

    #[test]
    fn panics_are_captured_and_others_still_run() {
        let completed = AtomicUsize::new(0);
        let results = fan_out("test", 3, |i| {
            if i == 1 {
                panic!("intentional panic for testing");
            }
            completed.fetch_add(1, Ordering::SeqCst);
        });
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Panicked)));
        assert!(results[2].is_ok());
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn single_task_panic_is_captured() {
        let results = fan_out("test", 1, |_| -> usize {
            panic!("intentional panic for testing");
        });
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Panicked)));
    }
}
