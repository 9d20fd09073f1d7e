//! Scenario runner
//!
//! Opens one device session per scenario, executes its steps in order and
//! closes the session whatever happened in between, including a panicking
//! step. The first failing step ends the scenario.

use std::panic::AssertUnwindSafe;
use std::path::Path;

use colored::Colorize;
use futures_util::FutureExt;

use crate::common::config::{ChartSampling, Config};
use crate::common::{Error, Result};
use crate::driver::{DeviceConnector, DeviceSession, SessionCapabilities};

use super::app::PostureApp;
use super::chart::ChartReading;
use super::config::{Scenario, ScenarioStep};

/// Outcome of one `set_checkbox` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxOutcome {
    pub label: String,
    pub checked: bool,
    /// Whether the checkbox had to be clicked
    pub changed: bool,
}

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    /// Kind of the error that failed the scenario, see [`Error::kind`]
    pub error_kind: Option<&'static str>,
    pub checkboxes: Vec<CheckboxOutcome>,
    pub chart_readings: Vec<(ChartReading, ChartReading)>,
    /// Set when closing the session failed
    pub teardown_error: Option<String>,
}

impl TestResult {
    fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            passed: false,
            steps_run: 0,
            steps_total: scenario.steps.len(),
            error: None,
            error_kind: None,
            checkboxes: Vec::new(),
            chart_readings: Vec::new(),
            teardown_error: None,
        }
    }

    fn fail(&mut self, error: &Error) {
        self.passed = false;
        if self.error.is_none() {
            self.error = Some(error.to_string());
            self.error_kind = Some(error.kind());
        }
    }
}

/// Settings shared by every scenario of a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub sampling: ChartSampling,
    pub verbose: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config, verbose: bool) -> Self {
        Self {
            sampling: config.chart.sampling(),
            verbose,
        }
    }
}

/// Run one scenario on a fresh session
///
/// Scenario failures, including a session that cannot be opened, are
/// reported in the returned [`TestResult`]. A panic inside a step is
/// re-raised after the session has been closed.
pub async fn run_scenario(
    connector: &dyn DeviceConnector,
    capabilities: &SessionCapabilities,
    scenario: &Scenario,
    options: &RunOptions,
) -> TestResult {
    let mut result = TestResult::new(scenario);

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    println!("\n{}", "Opening session...".cyan());
    let mut session = match connector.open(capabilities).await {
        Ok(session) => session,
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            tracing::error!("Scenario '{}' could not start: {}", scenario.name, e);
            result.fail(&e);
            return result;
        }
    };
    if options.verbose {
        println!("  Device: {}", capabilities.device_name.dimmed());
        println!("  App: {}", capabilities.app.display().to_string().dimmed());
    }
    println!("  {} Session started", "✓".green());

    println!("\n{}", "Steps:".cyan());
    let body = execute_steps(session.as_mut(), capabilities, scenario, options, &mut result);
    let outcome = AssertUnwindSafe(body).catch_unwind().await;

    // Cleanup: always close the session, exactly once
    let teardown = session.close().await;
    if let Err(e) = &teardown {
        println!("  {} Teardown: {}", "✗".red(), e);
        tracing::warn!("Closing session for '{}' failed: {}", scenario.name, e);
        result.teardown_error = Some(e.to_string());
    }

    match outcome {
        Err(panic) => {
            tracing::error!("Scenario '{}' panicked; session closed", scenario.name);
            std::panic::resume_unwind(panic);
        }
        Ok(Err(e)) => {
            result.fail(&e);
        }
        Ok(Ok(())) => match teardown {
            Ok(()) => {
                result.passed = true;
                println!(
                    "\n{} {}\n",
                    "✓".green().bold(),
                    "Test Passed".green().bold()
                );
            }
            Err(e) => result.fail(&e),
        },
    }

    if !result.passed {
        println!("\n{} {}\n", "✗".red().bold(), "Test Failed".red().bold());
    }
    result
}

/// Execute every step, stopping at the first failure
async fn execute_steps(
    session: &mut dyn DeviceSession,
    capabilities: &SessionCapabilities,
    scenario: &Scenario,
    options: &RunOptions,
    result: &mut TestResult,
) -> Result<()> {
    let mut app = PostureApp::new(session, capabilities, options.sampling);

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        result.steps_run = step_num;

        match execute_step(&mut app, step, result).await {
            Ok(detail) => {
                println!(
                    "  {} Step {}: {}{}",
                    "✓".green(),
                    step_num,
                    step.to_string().dimmed(),
                    detail.map(|d| format!(" ({})", d)).unwrap_or_default().dimmed()
                );
            }
            Err(e) => {
                println!("  {} Step {}: {}: {}", "✗".red(), step_num, step, e);
                tracing::error!("Scenario '{}' step {} ({}) failed: {}", scenario.name, step_num, step, e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Execute a single step, returning a short detail for the progress line
async fn execute_step(
    app: &mut PostureApp<'_>,
    step: &ScenarioStep,
    result: &mut TestResult,
) -> Result<Option<String>> {
    match step {
        ScenarioStep::StartService => app.start_service().await.map(|_| None),
        ScenarioStep::StopService => app.stop_service().await.map(|_| None),
        ScenarioStep::GoTo { screen } => app.go_to_screen(*screen).await.map(|_| None),
        ScenarioStep::SetCheckbox { label, checked } => {
            let changed = app.set_checkbox(label, *checked).await?;
            result.checkboxes.push(CheckboxOutcome {
                label: label.clone(),
                checked: *checked,
                changed,
            });
            Ok((!changed).then(|| "already in requested state".to_string()))
        }
        ScenarioStep::VerifyChart => {
            let (first, second) = app.verify_real_time_chart_data().await?;
            result.chart_readings.push((first, second));
            Ok(Some(format!("{} then {}", first, second)))
        }
        ScenarioStep::Rotate { orientation } => app.rotate(*orientation).await.map(|_| None),
        ScenarioStep::RequireCapability { name, value } => {
            app.require_capability(name, value).await.map(|_| None)
        }
    }
}

/// Run scenarios one after another, each with freshly built capabilities
pub async fn run_suite(
    connector: &dyn DeviceConnector,
    config: &Config,
    working_dir: &Path,
    scenarios: &[Scenario],
    options: &RunOptions,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let capabilities = SessionCapabilities::from_config(config, working_dir);
        results.push(run_scenario(connector, &capabilities, scenario, options).await);
    }
    results
}

/// Print a one-line-per-scenario summary; returns whether everything passed
pub fn print_summary(results: &[TestResult]) -> bool {
    println!("{}", "Summary:".cyan().bold());
    for r in results {
        if r.passed {
            println!("  {} {} ({} steps)", "✓".green(), r.name, r.steps_total);
        } else {
            println!(
                "  {} {} (failed at step {}/{}: {})",
                "✗".red(),
                r.name,
                r.steps_run,
                r.steps_total,
                r.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let all_passed = passed == results.len();
    let line = format!("{} passed, {} failed", passed, results.len() - passed);
    if all_passed {
        println!("\n{}", line.green().bold());
    } else {
        println!("\n{}", line.red().bold());
    }
    all_passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimulatedConnector;
    use crate::scenario::app::Screen;
    use crate::scenario::builtin;
    use std::time::Duration;

    fn options() -> RunOptions {
        RunOptions {
            sampling: ChartSampling::Fixed(Duration::ZERO),
            verbose: false,
        }
    }

    fn caps() -> SessionCapabilities {
        SessionCapabilities::from_config(&Config::default(), Path::new("/tmp"))
    }

    #[tokio::test]
    async fn test_smoke_passes_on_simulator() {
        let connector = SimulatedConnector::new();
        let smoke = builtin::find("smoke").unwrap();

        let result = run_scenario(&connector, &caps(), &smoke, &options()).await;

        assert!(result.passed, "smoke failed: {:?}", result.error);
        assert_eq!(result.steps_run, result.steps_total);
        assert_eq!(result.checkboxes.len(), 8);
        assert!(result.checkboxes.iter().all(|c| c.changed));
        assert_eq!(result.chart_readings.len(), 1);

        let state = connector.snapshot();
        assert_eq!(state.sessions_closed, 1);
        assert!(state.checkboxes.iter().all(|(_, checked)| *checked));
    }

    #[tokio::test]
    async fn test_failed_open_is_reported() {
        let connector = SimulatedConnector::new().refuse_open("apk missing");
        let smoke = builtin::find("smoke").unwrap();

        let result = run_scenario(&connector, &caps(), &smoke, &options()).await;

        assert!(!result.passed);
        assert_eq!(result.steps_run, 0);
        assert_eq!(result.error_kind, Some("session"));
        assert_eq!(connector.snapshot().sessions_closed, 0);
    }

    #[tokio::test]
    async fn test_teardown_failure_fails_passing_scenario() {
        let connector = SimulatedConnector::new().refuse_close();
        let scenario = Scenario {
            name: "nav".to_string(),
            description: None,
            enabled: true,
            steps: vec![ScenarioStep::GoTo {
                screen: Screen::Settings,
            }],
        };

        let result = run_scenario(&connector, &caps(), &scenario, &options()).await;

        assert!(!result.passed);
        assert_eq!(result.error_kind, Some("session"));
        assert!(result.teardown_error.is_some());
    }

    #[tokio::test]
    async fn test_first_failure_stops_scenario() {
        let connector = SimulatedConnector::new();
        let scenario = Scenario {
            name: "wrong-screen".to_string(),
            description: None,
            enabled: true,
            steps: vec![
                ScenarioStep::VerifyChart,
                ScenarioStep::GoTo { screen: Screen::Data },
            ],
        };

        let result = run_scenario(&connector, &caps(), &scenario, &options()).await;

        assert!(!result.passed);
        assert_eq!(result.steps_run, 1);
        assert_eq!(result.error_kind, Some("element_not_found"));
        assert_eq!(connector.snapshot().screen, "INTRO");
        assert_eq!(connector.snapshot().sessions_closed, 1);
    }

    #[tokio::test]
    async fn test_suite_builds_fresh_sessions() {
        let connector = SimulatedConnector::new();
        let scenarios = vec![
            builtin::find("smoke").unwrap(),
            builtin::find("rotations-settings").unwrap(),
        ];

        let results = run_suite(
            &connector,
            &Config::default(),
            Path::new("/tmp"),
            &scenarios,
            &options(),
        )
        .await;

        assert!(results.iter().all(|r| r.passed), "{:?}", results);
        let state = connector.snapshot();
        assert_eq!(state.sessions_opened, 2);
        assert_eq!(state.sessions_closed, 2);
        assert!(print_summary(&results));
    }
}
