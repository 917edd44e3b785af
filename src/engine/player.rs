//! Real-time audio playback using cpal

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::Engine;
use crate::config::AudioConfig;
use crate::ui::ScopeBuffer;

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start playing audio from the engine
    pub fn start(&mut self, engine: Arc<Mutex<Engine>>, audio: &AudioConfig) -> Result<()> {
        self.start_with_scope(engine, audio, None)
    }

    /// Start playing audio, copying every frame into `scope` as well
    pub fn start_with_scope(
        &mut self,
        engine: Arc<Mutex<Engine>>,
        audio: &AudioConfig,
        scope: Option<Arc<Mutex<ScopeBuffer>>>,
    ) -> Result<()> {
        let device = find_device(audio.device.as_deref())?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let default_config = device
            .default_output_config()
            .with_context(|| format!("no output config for device {}", name))?;
        let sample_format = default_config.sample_format();

        // The engine renders at the configured rate, so ask the device for it
        let stream_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: SampleRate(audio.sample_rate),
            buffer_size: BufferSize::Fixed(audio.buffer_size as u32),
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, engine, running, scope)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, engine, running, scope)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, engine, running, scope)?,
            other => return Err(anyhow!("Unsupported sample format {:?}", other)),
        };

        stream.play().context("failed to start output stream")?;
        info!(
            "playing on {} ({} Hz, {} channels, {:?})",
            name, audio.sample_rate, stream_config.channels, sample_format
        );
        self.stream = Some(stream);

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        engine: Arc<Mutex<Engine>>,
        running: Arc<AtomicBool>,
        scope: Option<Arc<Mutex<ScopeBuffer>>>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::SeqCst) {
                    fill_silence(data);
                    return;
                }

                let Ok(mut eng) = engine.try_lock() else {
                    // UI thread holds the engine, skip this buffer
                    fill_silence(data);
                    return;
                };

                let mut scope = scope.as_ref().and_then(|s| s.try_lock().ok());
                for frame in data.chunks_mut(channels) {
                    let sample = eng.process() as f32;
                    if let Some(buf) = scope.as_mut() {
                        buf.push(sample);
                    }
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
            },
            |err| {
                warn!("audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_silence<T: cpal::Sample + cpal::FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0f32);
    }
}

/// Output device by name, or the default device
fn find_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => host
            .output_devices()
            .context("failed to enumerate output devices")?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| anyhow!("Output device not found: {}", wanted)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available")),
    }
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
