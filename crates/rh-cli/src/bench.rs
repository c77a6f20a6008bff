use std::time::Instant;

use clap::ValueEnum;

use rh_core::{Engine, Profile, RequestContext, RewriteResult};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Phase {
    /// URL redirect resolution
    Url,
    /// Request header and cookie rewriting
    Request,
    /// Response header, Set-Cookie and CSP rewriting
    Response,
}

impl Phase {
    pub fn run(self, engine: &Engine, profiles: &[Profile], ctx: &RequestContext<'_>) -> RewriteResult {
        match self {
            Self::Url => engine.modify_request_urls(profiles, ctx),
            Self::Request => engine.modify_request_headers(profiles, ctx),
            Self::Response => engine.modify_response_headers(profiles, ctx),
        }
    }
}

pub struct BenchOptions {
    pub phases: Vec<Phase>,
    pub iterations: usize,
    pub warmup_ops: usize,
}

#[derive(Debug, Clone)]
pub struct LatencySummary {
    pub phase: Phase,
    pub samples: usize,
    pub mean_us: f64,
    pub p50_us: f64,
    pub p90_us: f64,
    pub p99_us: f64,
    pub max_us: f64,
}

pub fn run_bench(
    engine: &Engine,
    profiles: &[Profile],
    ctx: &RequestContext<'_>,
    opts: &BenchOptions,
) -> Result<Vec<LatencySummary>, String> {
    if opts.iterations == 0 {
        return Err("Iterations must be greater than zero".to_string());
    }

    let mut summaries = Vec::with_capacity(opts.phases.len());
    for &phase in &opts.phases {
        for _ in 0..opts.warmup_ops {
            std::hint::black_box(phase.run(engine, profiles, ctx));
        }

        let mut latencies = Vec::with_capacity(opts.iterations);
        for _ in 0..opts.iterations {
            let start = Instant::now();
            std::hint::black_box(phase.run(engine, profiles, ctx));
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
        }
        summaries.push(summarize(phase, latencies));
    }
    Ok(summaries)
}

fn summarize(phase: Phase, mut latencies: Vec<f64>) -> LatencySummary {
    latencies.sort_by(f64::total_cmp);
    let mean_us = latencies.iter().sum::<f64>() / latencies.len().max(1) as f64;
    LatencySummary {
        phase,
        samples: latencies.len(),
        mean_us,
        p50_us: percentile(&latencies, 0.50),
        p90_us: percentile(&latencies, 0.90),
        p99_us: percentile(&latencies, 0.99),
        max_us: latencies.last().copied().unwrap_or(0.0),
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

pub fn print_summaries(summaries: &[LatencySummary]) {
    println!("{:<10} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}", "phase", "samples", "mean", "p50", "p90", "p99", "max");
    for s in summaries {
        println!(
            "{:<10} {:>8} {:>8.2}μs {:>8.2}μs {:>8.2}μs {:>8.2}μs {:>8.2}μs",
            format!("{:?}", s.phase).to_lowercase(),
            s.samples,
            s.mean_us,
            s.p50_us,
            s.p90_us,
            s.p99_us,
            s.max_us
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_core::{HeaderModifier, Profile};

    #[test]
    fn test_percentile() {
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 0.50), 50.0);
        assert_eq!(percentile(&sorted, 0.99), 99.0);
        assert_eq!(percentile(&sorted, 1.0), 100.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_run_bench() {
        let engine = Engine::default();
        let profiles = vec![Profile {
            headers: vec![HeaderModifier::new("X-Test", "1")],
            ..Profile::default()
        }];
        let ctx = RequestContext::for_url("https://example.com/");
        let opts = BenchOptions {
            phases: vec![Phase::Url, Phase::Request],
            iterations: 10,
            warmup_ops: 2,
        };
        let summaries = run_bench(&engine, &profiles, &ctx, &opts).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].phase, Phase::Request);
        assert_eq!(summaries[1].samples, 10);
        assert!(summaries[1].p50_us <= summaries[1].max_us);

        let none = BenchOptions { iterations: 0, ..opts };
        assert!(run_bench(&engine, &profiles, &ctx, &none).is_err());
    }
}
