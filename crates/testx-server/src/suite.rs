//! An explicit, ordered test suite for exercising servers
//!
//! Each case gets a fresh fixture from the setup hook, and the teardown hook runs after every
//! case, whether it passed, failed or panicked. Cases run one at a time in the order they were
//! added.
//!
//! ```no_run
//! use futures::FutureExt as _;
//! use testx_server::suite::{TestSuite, ensure};
//! use testx_server::TestxServer;
//!
//! # async fn run() {
//! let report = TestSuite::new("users", || {
//!     async {
//!         let mut server = TestxServer::new("type User { name: String }");
//!         server.bootstrap().await?;
//!         Ok(server)
//!     }
//!     .boxed()
//! })
//! .teardown(|mut server| async move { server.shutdown().await }.boxed())
//! .case("starts empty", |server| {
//!     async move {
//!         let data = server.get_data().await?;
//!         ensure(data["User"].as_array().is_some_and(Vec::is_empty), "no users")
//!     }
//!     .boxed()
//! })
//! .run()
//! .await;
//! assert!(report.passed(), "{report}");
//! # }
//! ```

use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::errors::ServerError;

/// Why a case did not pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CaseFailure(String);

impl CaseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ServerError> for CaseFailure {
    fn from(error: ServerError) -> Self {
        Self(error.to_string())
    }
}

impl From<serde_json::Error> for CaseFailure {
    fn from(error: serde_json::Error) -> Self {
        Self(error.to_string())
    }
}

pub type CaseResult = Result<(), CaseFailure>;

/// Fail with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> CaseResult {
    if condition {
        Ok(())
    } else {
        Err(CaseFailure::new(message))
    }
}

type Setup<F> = Box<dyn Fn() -> BoxFuture<'static, Result<F, CaseFailure>> + Send + Sync>;
type Teardown<F> = Box<dyn Fn(F) -> BoxFuture<'static, ()> + Send + Sync>;
type CaseFn<F> = Box<dyn for<'f> Fn(&'f mut F) -> BoxFuture<'f, CaseResult> + Send + Sync>;

struct Case<F> {
    name: String,
    run: CaseFn<F>,
}

/// Named cases sharing a setup and teardown over a fixture of type `F`
pub struct TestSuite<F> {
    name: String,
    setup: Setup<F>,
    teardown: Teardown<F>,
    cases: Vec<Case<F>>,
}

impl<F: Send + 'static> TestSuite<F> {
    pub fn new<S>(name: impl Into<String>, setup: S) -> Self
    where
        S: Fn() -> BoxFuture<'static, Result<F, CaseFailure>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            setup: Box::new(setup),
            teardown: Box::new(|fixture| {
                drop(fixture);
                async {}.boxed()
            }),
            cases: Vec::new(),
        }
    }

    /// Replace the teardown hook. By default the fixture is dropped.
    pub fn teardown<T>(mut self, teardown: T) -> Self
    where
        T: Fn(F) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.teardown = Box::new(teardown);
        self
    }

    pub fn case<C>(mut self, name: impl Into<String>, case: C) -> Self
    where
        C: for<'f> Fn(&'f mut F) -> BoxFuture<'f, CaseResult> + Send + Sync + 'static,
    {
        self.cases.push(Case {
            name: name.into(),
            run: Box::new(case),
        });
        self
    }

    pub async fn run(&self) -> SuiteReport {
        let mut outcomes = Vec::with_capacity(self.cases.len());

        for case in &self.cases {
            debug!(suite = %self.name, case = %case.name, "Running case");
            let result = match (self.setup)().await {
                Ok(mut fixture) => {
                    let result = AssertUnwindSafe((case.run)(&mut fixture))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(CaseFailure::new("case panicked")));
                    (self.teardown)(fixture).await;
                    result
                }
                Err(failure) => Err(CaseFailure::new(format!("setup failed: {failure}"))),
            };

            match &result {
                Ok(()) => info!(suite = %self.name, case = %case.name, "passed"),
                Err(failure) => warn!(suite = %self.name, case = %case.name, %failure, "failed"),
            }
            outcomes.push(CaseOutcome {
                name: case.name.clone(),
                result,
            });
        }

        SuiteReport {
            suite: self.name.clone(),
            outcomes,
        }
    }
}

/// The result of a single case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: String,
    pub result: CaseResult,
}

/// The results of every case of a suite, in order
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }
}

impl Display for SuiteReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let failed = self.failures().count();
        write!(
            f,
            "{}: {} passed, {failed} failed",
            self.suite,
            self.outcomes.len() - failed
        )?;
        for outcome in self.failures() {
            if let Err(failure) = &outcome.result {
                write!(f, "\n  {}: {failure}", outcome.name)?;
            }
        }
        Ok(())
    }
}
