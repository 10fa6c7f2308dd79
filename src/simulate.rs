use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel as channel;
use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use serde::Serialize;
use tracing::{debug, info};

use speedbar::{ewma_speed, AverageSpeed, Decorators, SpeedConfig, Statistics, UnitSystem};

use crate::cli::Simulate;

enum Progress {
    Chunk { n: i64, elapsed: Duration },
    Paused(Duration),
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_bytes: i64,
    pub chunks: u64,
    pub elapsed_secs: f64,
    pub paused_secs: f64,
    pub completed: bool,
    pub line: String,
}

pub fn run_simulate(sim: Simulate) -> Result<Summary> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop = stop_flag.clone();
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    let mut stdout = std::io::stdout();
    run_simulate_with_shutdown(sim, stop_flag, &mut stdout)
}

fn compose(sim: &Simulate, start: Instant) -> Result<Decorators> {
    let unit = UnitSystem::from(sim.unit);
    let config = SpeedConfig::default().width(sim.width).justify(sim.justify.into());
    let smoothed = ewma_speed(unit, &sim.format, sim.age, config)
        .with_context(|| format!("Building smoothed speed from {:?}", sim.format))?;
    let average = AverageSpeed::with_start(unit, &sim.format, start, config)
        .with_context(|| format!("Building average speed from {:?}", sim.format))?;

    Ok(Decorators::new()
        .with(|st: &Statistics| format!("{:>3}%", percent(st)))
        .with(smoothed)
        .with(average))
}

fn percent(st: &Statistics) -> i64 {
    if st.total <= 0 {
        return 0;
    }
    (st.current * 100 / st.total).min(100)
}

pub(crate) fn run_simulate_with_shutdown<W: Write>(
    sim: Simulate,
    stop_flag: Arc<AtomicBool>,
    out: &mut W,
) -> Result<Summary> {
    let start = Instant::now();
    let mut decorators = compose(&sim, start)?;
    let total = i64::try_from(sim.total).context("Total does not fit a signed 64-bit counter")?;
    info!(total, chunk = sim.chunk, chunk_ms = sim.chunk_ms, "Starting simulation");

    let (progress_tx, progress_rx) = channel::bounded::<Progress>(1024);

    // Producer: pretends to move `chunk` bytes every `chunk_ms`
    let stop_producer = stop_flag.clone();
    let producer_sim = sim.clone();
    let producer = thread::spawn(move || {
        let mut sent = 0u64;
        let mut paused = false;
        while sent < producer_sim.total && !stop_producer.load(Ordering::Relaxed) {
            if let Some(at) = producer_sim.pause_at {
                if !paused && sent >= at {
                    paused = true;
                    let began = Instant::now();
                    thread::sleep(Duration::from_millis(producer_sim.pause_ms));
                    if progress_tx.send(Progress::Paused(began.elapsed())).is_err() {
                        break;
                    }
                }
            }
            let n = producer_sim.chunk.min(producer_sim.total - sent);
            let began = Instant::now();
            thread::sleep(Duration::from_millis(producer_sim.chunk_ms));
            sent += n;
            let chunk = Progress::Chunk { n: n as i64, elapsed: began.elapsed() };
            if progress_tx.send(chunk).is_err() {
                break;
            }
        }
    });

    let tick = Duration::from_millis(sim.tick_ms.max(1));
    let mut stats = Statistics::new(total, 0);
    let mut chunks = 0u64;
    let mut paused_for = Duration::ZERO;
    let mut last_draw = Instant::now();

    loop {
        match progress_rx.recv_timeout(tick) {
            Ok(Progress::Chunk { n, elapsed }) => {
                stats.current += n;
                chunks += 1;
                decorators.next_amount(n, elapsed);
            }
            Ok(Progress::Paused(d)) => {
                paused_for += d;
                debug!(paused_ms = d.as_millis() as u64, "Excluding stall from average");
                decorators.average_adjust(start + paused_for);
            }
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }
        if last_draw.elapsed() >= tick {
            draw(out, &decorators.render_line(&stats, " "))?;
            last_draw = Instant::now();
        }
    }
    let _ = producer.join();

    stats.completed = stats.current >= total;
    if stats.completed {
        if let Some(msg) = &sim.done_msg {
            decorators.on_complete_message(msg);
        }
    }
    let line = decorators.render_line(&stats, " ");
    draw(out, &line)?;
    writeln!(out).context("Writing final frame")?;

    let summary = Summary {
        total_bytes: stats.current,
        chunks,
        elapsed_secs: start.elapsed().as_secs_f64(),
        paused_secs: paused_for.as_secs_f64(),
        completed: stats.completed,
        line,
    };
    info!(bytes = summary.total_bytes, chunks, completed = summary.completed, "Simulation finished");
    Ok(summary)
}

fn draw<W: Write>(out: &mut W, line: &str) -> Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line)).context("Drawing frame")?;
    out.flush().context("Flushing frame")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{JustifyOpt, SummaryFormat, UnitOpt};

    fn small(total: u64) -> Simulate {
        Simulate {
            total,
            chunk: 1024,
            chunk_ms: 1,
            pause_at: None,
            pause_ms: 0,
            unit: UnitOpt::Binary,
            format: "% .1f".into(),
            age: 30.0,
            width: 0,
            justify: JustifyOpt::Right,
            tick_ms: 2,
            done_msg: Some("done".into()),
            summary: SummaryFormat::Text,
        }
    }

    #[test]
    fn runs_to_completion() {
        let mut out = Vec::new();
        let summary = run_simulate_with_shutdown(small(8 * 1024), Arc::new(AtomicBool::new(false)), &mut out).unwrap();
        assert!(summary.completed);
        assert_eq!(summary.total_bytes, 8 * 1024);
        assert_eq!(summary.chunks, 8);
        assert_eq!(summary.line, "100% done done");
        assert!(String::from_utf8_lossy(&out).contains("100% done done"));
    }

    #[test]
    fn stop_flag_leaves_bar_incomplete() {
        let mut out = Vec::new();
        let mut sim = small(1 << 30);
        sim.chunk_ms = 5;
        let stop = Arc::new(AtomicBool::new(true));
        let summary = run_simulate_with_shutdown(sim, stop, &mut out).unwrap();
        assert!(!summary.completed);
        assert!(!summary.line.contains("done"));
    }

    #[test]
    fn stall_is_reported() {
        let mut out = Vec::new();
        let mut sim = small(4 * 1024);
        sim.pause_at = Some(2048);
        sim.pause_ms = 10;
        let summary = run_simulate_with_shutdown(sim, Arc::new(AtomicBool::new(false)), &mut out).unwrap();
        assert!(summary.completed);
        assert!(summary.paused_secs >= 0.01);
    }

    #[test]
    fn bad_format_fails_before_starting() {
        let mut sim = small(1024);
        sim.format = "%z".into();
        let err = run_simulate_with_shutdown(sim, Arc::new(AtomicBool::new(false)), &mut Vec::new()).unwrap_err();
        assert!(err.chain().any(|c| c.is::<speedbar::FormatError>()));
    }
}
