//! Tristream Demo - Simulated Frame Loop
//!
//! Producer (main thread) menulis "pixel" frame ke ring setiap iterasi,
//! consumer thread mensimulasikan GPU: membaca section yang di-publish,
//! memverifikasi frame tidak torn, lalu men-signal timeline.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tristream::core::{Section, StreamingRing};
use tristream::sync::TimelineProvider;
use tristream::{Backing, RingConfig, RingError, WaitPolicy};

/// Demo configuration
struct DemoConfig {
    frames: u64,
    sections: usize,
    section_size: usize,
    consumer_us: u64,
    policy: WaitPolicy,
    timeout_ms: Option<u64>,
    coherent: bool,
    file: Option<String>,
    verbose: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            sections: 3,
            section_size: 1280 * 720 * 4,
            consumer_us: 2000,
            policy: WaitPolicy::default(),
            timeout_ms: None,
            coherent: true,
            file: None,
            verbose: false,
        }
    }
}

/// Hasil dari consumer thread
#[derive(Default)]
struct ConsumerStats {
    frames: u64,
    torn: u64,
    bytes: u64,
}

/// Frame stamp: 8 byte nomor frame (LE), sisanya diisi low byte frame
fn fill_frame(bytes: &mut [u8], frame: u64) {
    bytes[..8].copy_from_slice(&frame.to_le_bytes());
    bytes[8..].fill(frame as u8);
}

fn verify_frame(bytes: &[u8], frame: u64) -> bool {
    let mut stamp = [0u8; 8];
    stamp.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(stamp) == frame && bytes[8..].iter().all(|&b| b == frame as u8)
}

fn run_demo(config: DemoConfig) -> Result<(), RingError> {
    println!("🎞️  Tristream Demo - Streaming Ring");
    println!("===================================\n");

    let backing = match &config.file {
        Some(path) => Backing::File(path.into()),
        None => Backing::Anonymous,
    };

    let ring_config = RingConfig::new(config.section_size, config.sections)
        .coherent(config.coherent)
        .backing(backing)
        .wait_policy(config.policy);

    let (provider, signal) = TimelineProvider::new();
    let mut ring = StreamingRing::new(ring_config, provider)?;
    let view = ring.consumer_view();

    println!("  Sections:     {}", config.sections);
    println!("  Section size: {} KB", config.section_size / 1024);
    println!("  Consumer:     {} μs/frame", config.consumer_us);
    println!("  Policy:       {:?}\n", config.policy);

    let (tx, rx) = mpsc::channel::<(u64, Section)>();
    let consumer_delay = Duration::from_micros(config.consumer_us);

    let consumer = thread::spawn(move || {
        let mut stats = ConsumerStats::default();
        for (frame, section) in rx {
            // SAFETY: Section sudah di-publish dan token-nya baru di-signal
            // setelah read selesai
            let ok = unsafe { view.with_section(section, |bytes| verify_frame(bytes, frame)) };
            match ok {
                Some(true) => {}
                Some(false) => {
                    stats.torn += 1;
                    log::error!("torn frame {} in section {}", frame, section.index);
                }
                None => {
                    log::error!("region released while consumer was still reading");
                    break;
                }
            }

            thread::sleep(consumer_delay);
            stats.frames += 1;
            stats.bytes += section.len as u64;
            signal.signal_next();
        }
        stats
    });

    let deadline = config.timeout_ms.map(Duration::from_millis);
    let mut skipped = 0u64;
    let start = Instant::now();

    for frame in 0..config.frames {
        let mut polls = 0u64;
        let mut writer = match ring.acquire_next_with(deadline, |_| polls += 1) {
            Ok(writer) => writer,
            Err(e) if e.is_recoverable() => {
                skipped += 1;
                log::warn!("skipping frame {}: {}", frame, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        fill_frame(&mut writer, frame);
        let index = writer.index();
        let section = ring.publish(index)?;

        if polls > 0 {
            log::debug!("frame {} waited {} polls for section {}", frame, polls, index);
        }

        if tx.send((frame, section)).is_err() {
            log::error!("consumer thread exited early");
            break;
        }
    }

    drop(tx);
    let producer_elapsed = start.elapsed();

    let consumer_stats = match consumer.join() {
        Ok(stats) => stats,
        Err(_) => {
            log::error!("consumer thread panicked");
            ConsumerStats::default()
        }
    };

    let stats = ring.shutdown(Some(Duration::from_secs(1)))?;

    if let Some(path) = &config.file {
        std::fs::remove_file(path).ok();
    }

    let fps = stats.publishes as f64 / producer_elapsed.as_secs_f64();

    println!("📊 Ring Stats (elapsed: {:.2}s)", producer_elapsed.as_secs_f64());
    println!("   Frames published: {} ({:.1} fps)", stats.publishes, fps);
    println!("   Frames skipped:   {}", skipped);
    println!("   Stalled acquires: {}", stats.stalls);
    println!("   Wait iterations:  {}", stats.wait_iterations);
    println!("   Total wait:       {:.2} ms", stats.total_wait.as_secs_f64() * 1000.0);
    println!("   Timeouts:         {}", stats.timeouts);
    println!("\n📊 Consumer Stats");
    println!("   Frames consumed:  {}", consumer_stats.frames);
    println!("   Bytes consumed:   {} MB", consumer_stats.bytes / 1024 / 1024);
    if consumer_stats.torn > 0 {
        println!("   Torn frames:      {} ⚠️", consumer_stats.torn);
    } else {
        println!("   Torn frames:      0 ✅");
    }

    Ok(())
}

fn parse_policy(name: &str) -> Option<WaitPolicy> {
    match name {
        "spin" => Some(WaitPolicy::Spin {
            quantum: Duration::ZERO,
        }),
        "backoff" => Some(WaitPolicy::default()),
        "blocking" => Some(WaitPolicy::Blocking),
        _ => None,
    }
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" | "-f" => {
                if i + 1 < args.len() {
                    config.frames = args[i + 1].parse().unwrap_or(600);
                    i += 1;
                }
            }
            "--sections" | "-n" => {
                if i + 1 < args.len() {
                    config.sections = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--section-size" => {
                if i + 1 < args.len() {
                    // Minimal 8 byte untuk frame stamp
                    config.section_size = args[i + 1].parse().unwrap_or(1280 * 720 * 4).max(8);
                    i += 1;
                }
            }
            "--consumer-us" => {
                if i + 1 < args.len() {
                    config.consumer_us = args[i + 1].parse().unwrap_or(2000);
                    i += 1;
                }
            }
            "--policy" | "-p" => {
                if i + 1 < args.len() {
                    match parse_policy(&args[i + 1]) {
                        Some(policy) => config.policy = policy,
                        None => eprintln!("unknown policy '{}', using backoff", args[i + 1]),
                    }
                    i += 1;
                }
            }
            "--timeout-ms" => {
                if i + 1 < args.len() {
                    config.timeout_ms = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--non-coherent" => {
                config.coherent = false;
            }
            "--file" => {
                if i + 1 < args.len() {
                    config.file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Tristream Demo - Triple-Buffered Streaming Ring\n");
                println!("Usage: tristream_demo [OPTIONS]\n");
                println!("Options:");
                println!("  -f, --frames <N>         Frames to stream (default: 600)");
                println!("  -n, --sections <N>       Ring sections (default: 3)");
                println!("      --section-size <B>   Bytes per section (default: 1280x720 RGBA)");
                println!("      --consumer-us <US>   Simulated consumer time per frame (default: 2000)");
                println!("  -p, --policy <NAME>      spin | backoff | blocking (default: backoff)");
                println!("      --timeout-ms <MS>    Skip a frame if acquire waits longer than this");
                println!("      --non-coherent       Issue a visibility barrier on publish");
                println!("      --file <PATH>        Back the region with a shared file mapping");
                println!("  -v, --verbose            Debug logging");
                println!("  -h, --help               Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    let default_filter = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run_demo(config) {
        eprintln!("❌ Demo error: {} ({})", e, e.category());
        std::process::exit(1);
    }
}
