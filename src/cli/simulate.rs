//! Scripted scenario runner.
//!
//! Registers simulated animations and wraps simulated requests on a real
//! barrier, then reports when each request settled and when its gate let
//! the result through.

use std::time::Duration;

use colored::*;
use eyre::{Context, Result, bail, eyre};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;

use quiesce::{AnimationLabel, Barrier, BarrierConfig, BarrierStats, GateError};

/// A simulated animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSpec {
    /// Duration declared to the barrier; zero means none.
    pub declared_ms: u64,
    /// When the animation actually finishes; `None` never finishes.
    pub runtime_ms: Option<u64>,
}

impl AnimationSpec {
    /// Parse `DURATION_MS[:RUNTIME_MS|never]`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (declared, runtime) = match spec.split_once(':') {
            Some((declared, runtime)) => (declared, Some(runtime)),
            None => (spec, None),
        };
        let declared_ms: u64 = declared
            .trim()
            .parse()
            .context(format!("Invalid animation duration in '{}'", spec))?;
        let runtime_ms = match runtime.map(str::trim) {
            None => Some(declared_ms),
            Some("never") => None,
            Some(ms) => Some(ms.parse::<u64>().context(format!("Invalid animation runtime in '{}'", spec))?),
        };
        Ok(Self {
            declared_ms,
            runtime_ms,
        })
    }

    fn declared(&self) -> Option<Duration> {
        (self.declared_ms > 0).then(|| Duration::from_millis(self.declared_ms))
    }
}

/// A simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSpec {
    pub succeeds: bool,
    pub settle_ms: u64,
}

impl RequestSpec {
    /// Parse `[ok|fail]:SETTLE_MS`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (outcome, settle) = spec
            .split_once(':')
            .ok_or_else(|| eyre!("Request '{}' must look like ok:MS or fail:MS", spec))?;
        let succeeds = match outcome.trim() {
            "ok" => true,
            "fail" => false,
            other => bail!("Unknown request outcome '{}' in '{}'", other, spec),
        };
        let settle_ms = settle
            .trim()
            .parse()
            .context(format!("Invalid request settle time in '{}'", spec))?;
        Ok(Self { succeeds, settle_ms })
    }
}

/// What happened to one request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub index: usize,
    pub outcome: String,
    pub settled_ms: u64,
    pub released_ms: u64,
}

impl RequestReport {
    pub fn held_ms(&self) -> u64 {
        self.released_ms.saturating_sub(self.settled_ms)
    }
}

/// Result of a whole scenario.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: BarrierConfig,
    pub requests: Vec<RequestReport>,
    pub quiescent_ms: Option<u64>,
    pub stats: BarrierStats,
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Run a scenario to completion.
pub async fn run(config: BarrierConfig, animations: &[AnimationSpec], requests: &[RequestSpec]) -> Result<SimulationReport> {
    let barrier = Barrier::new(config).context("Failed to create barrier")?;
    let start = Instant::now();

    for (index, anim) in animations.iter().enumerate() {
        let runtime = anim.runtime_ms;
        let signal = async move {
            match runtime {
                Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                None => futures::future::pending::<()>().await,
            }
        };
        let label = AnimationLabel::new()
            .target(format!("animation-{}", index))
            .property("simulated");
        barrier.register(signal, anim.declared(), label);
    }

    let quiescent = {
        let signal = barrier.barrier_signal();
        let had_epoch = !signal.is_settled();
        tokio::spawn(async move {
            signal.wait().await;
            had_epoch.then(|| millis(start.elapsed()))
        })
    };

    let mut gates = JoinSet::new();
    for (index, req) in requests.iter().copied().enumerate() {
        let gate = barrier.wrap(async move {
            tokio::time::sleep(Duration::from_millis(req.settle_ms)).await;
            let at = millis(start.elapsed());
            if req.succeeds { Ok(at) } else { Err(at) }
        });
        gates.spawn(async move {
            let (outcome, settled_ms) = match gate.await {
                Ok(at) => ("ok", at),
                Err(GateError::Operation(at)) => ("fail", at),
                Err(GateError::Cancelled) => ("cancelled", 0),
            };
            RequestReport {
                index,
                outcome: outcome.to_string(),
                settled_ms,
                released_ms: millis(start.elapsed()),
            }
        });
    }

    let mut reports = Vec::with_capacity(requests.len());
    while let Some(report) = gates.join_next().await {
        reports.push(report.context("Request task failed")?);
    }
    reports.sort_by_key(|r| r.index);

    let quiescent_ms = quiescent.await.context("Barrier watcher failed")?;

    Ok(SimulationReport {
        config,
        requests: reports,
        quiescent_ms,
        stats: barrier.stats(),
    })
}

/// Render a report for the terminal.
pub fn print_report(report: &SimulationReport) {
    println!(
        "{} min_timeout={}ms default_timeout={}ms",
        "Barrier:".cyan(),
        report.config.min_timeout_ms,
        report.config.default_timeout_ms
    );
    match report.quiescent_ms {
        Some(ms) => println!("{} {}ms", "Quiescent at:".cyan(), ms),
        None => println!("{} no animations registered", "Quiescent at:".cyan()),
    }
    for r in &report.requests {
        let outcome = match r.outcome.as_str() {
            "ok" => r.outcome.green(),
            "fail" => r.outcome.red(),
            _ => r.outcome.yellow(),
        };
        println!(
            "  request {:>2}  {:<9} settled {:>5}ms  released {:>5}ms  held {:>5}ms",
            r.index,
            outcome,
            r.settled_ms,
            r.released_ms,
            r.held_ms()
        );
    }
    let stats = &report.stats;
    println!(
        "{} epochs {}/{} drained, animations {} settled / {} expired / {} skipped, requests {} immediate / {} drained",
        "Stats:".cyan(),
        stats.epochs_drained,
        stats.epochs_started,
        stats.animations_settled,
        stats.animations_expired,
        stats.animations_skipped,
        stats.requests_released_immediately,
        stats.requests_released_by_drain
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_animation_plain() {
        let spec = AnimationSpec::parse("300").unwrap();
        assert_eq!(spec.declared_ms, 300);
        assert_eq!(spec.runtime_ms, Some(300));
    }

    #[test]
    fn test_parse_animation_runtime() {
        let spec = AnimationSpec::parse("300:450").unwrap();
        assert_eq!(spec.runtime_ms, Some(450));
    }

    #[test]
    fn test_parse_animation_never() {
        let spec = AnimationSpec::parse("100:never").unwrap();
        assert_eq!(spec.runtime_ms, None);
    }

    #[test]
    fn test_parse_animation_zero_has_no_declared_duration() {
        let spec = AnimationSpec::parse("0:never").unwrap();
        assert!(spec.declared().is_none());
    }

    #[test]
    fn test_parse_animation_invalid() {
        assert!(AnimationSpec::parse("soon").is_err());
        assert!(AnimationSpec::parse("100:later").is_err());
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(
            RequestSpec::parse("ok:50").unwrap(),
            RequestSpec {
                succeeds: true,
                settle_ms: 50
            }
        );
        assert!(!RequestSpec::parse("fail:10").unwrap().succeeds);
    }

    #[test]
    fn test_parse_request_invalid() {
        assert!(RequestSpec::parse("50").is_err());
        assert!(RequestSpec::parse("maybe:50").is_err());
        assert!(RequestSpec::parse("ok:x").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_animations() {
        let requests = [RequestSpec::parse("ok:40").unwrap()];
        let report = run(BarrierConfig::default(), &[], &requests).await.unwrap();

        assert_eq!(report.quiescent_ms, None);
        assert_eq!(report.requests[0].settled_ms, 40);
        assert_eq!(report.requests[0].released_ms, 40);
        assert_eq!(report.requests[0].held_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stalled_animation_expires() {
        let animations = [AnimationSpec::parse("100:never").unwrap()];
        let requests = [RequestSpec::parse("fail:50").unwrap()];
        let config = BarrierConfig::new(500, 2000);

        let report = run(config, &animations, &requests).await.unwrap();

        assert_eq!(report.quiescent_ms, Some(500));
        assert_eq!(report.requests[0].outcome, "fail");
        assert_eq!(report.requests[0].settled_ms, 50);
        assert_eq!(report.requests[0].released_ms, 500);
        assert_eq!(report.stats.animations_expired, 1);
        assert_eq!(report.stats.requests_released_by_drain, 1);
    }
}
