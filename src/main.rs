//! keysynth - Polyphonic terminal synthesizer

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use keysynth::config::{self, SynthConfig};
use keysynth::engine::{self, Engine, Player, Recorder, Score};
use keysynth::ui::{self, ScopeBuffer};

mod cli;

use cli::{Cli, Commands};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load(path: Option<&Path>) -> Result<SynthConfig> {
    if let Some(path) = path {
        println!("Loading configuration from {:?}...", path);
    }
    config::load_or_default(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = load(config_path.as_deref())?;

            let engine = Arc::new(Mutex::new(Engine::new(&cfg)));
            let scope = Arc::new(Mutex::new(ScopeBuffer::new(2048)));

            let mut player = Player::new();
            player.start_with_scope(engine.clone(), &cfg.audio, Some(scope.clone()))?;

            let result = ui::run(engine.clone(), scope, &cfg.keyboard);
            player.stop();

            if let Ok(mut engine) = engine.lock() {
                engine.panic().ok();
            }
            result?;
        }

        Commands::Record {
            config: config_path,
            output,
            score,
        } => {
            let cfg = load(config_path.as_deref())?;

            let score = match score {
                Some(path) => {
                    println!("Loading score from {:?}...", path);
                    engine::load_score(&path)?
                }
                None => {
                    println!("No score given, rendering the demo score");
                    Score::demo()
                }
            };

            let cancel = Arc::new(AtomicBool::new(false));
            {
                let cancel = cancel.clone();
                ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
                    .context("failed to install Ctrl-C handler")?;
            }

            println!(
                "Rendering {} notes to {:?} at {} Hz...",
                score.events.len(),
                output,
                cfg.audio.sample_rate
            );

            let mut engine = Engine::new(&cfg);
            let recorder = Recorder::new(&output, cfg.audio.sample_rate)?;
            let summary = engine::render_score(&mut engine, &score, recorder, &cancel)?;

            if summary.cancelled {
                println!("Interrupted after {:.2}s", summary.duration_secs);
            }
            println!("Recorded {:.2}s to {:?}", summary.duration_secs, output);
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = engine::default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            let devices = engine::list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    if let Some(device) = &cfg.audio.device {
                        println!("  Device: {}", device);
                    }
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    let env = &cfg.voice.envelope;
                    println!(
                        "  Envelope: A {}s  D {}s  S {:.0}%  R {}s",
                        env.attack,
                        env.decay,
                        env.sustain * 100.0,
                        env.release
                    );
                    println!("  Partials: {}", cfg.voice.partials.len());
                    for partial in &cfg.voice.partials {
                        println!(
                            "    - x{} {:?} mix {:.2} detune {:+}c",
                            partial.ratio, partial.waveform, partial.mix, partial.detune
                        );
                    }
                    println!("  Base note: {}", cfg.keyboard.base_note);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../keysynth.example.yaml");

            let path = "keysynth.yaml";
            if std::path::Path::new(path).exists() {
                println!("keysynth.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created keysynth.yaml with example configuration.");
            }
        }
    }

    Ok(())
}
