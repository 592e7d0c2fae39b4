// Click engine - cpal output stream rendering metronome clicks
//
// Clicks arrive through a ringbuf queue and are synthesized by a `Metronome`
// owned by the audio callback, at the pitch and length each click asks for. Everything is computed in f32 and converted
// to the device sample format when written to the output buffer.
//
// The cpal `Stream` is not Send on every platform, so the engine stays on the
// thread that created it. Other threads get a `ClickTrigger`.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::audio::click::ClickSynth;
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::parameters::AtomicF32;
use crate::messaging::channels::{ClickConsumer, ClickProducer, create_click_channel};
use crate::sequencer::metronome::{ClickNote, Metronome};

const CLICK_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0} (supported: F32, I16, U16)")]
    UnsupportedFormat(String),

    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// Queues clicks for the audio callback; cheap to clone across threads
#[derive(Clone)]
pub struct ClickTrigger {
    queue: Arc<Mutex<ClickProducer>>,
}

impl ClickSynth for ClickTrigger {
    fn trigger(&self, click: ClickNote) {
        match self.queue.lock() {
            Ok(mut queue) => {
                if queue.try_push(click).is_err() {
                    log::warn!("Click queue full, dropping click");
                }
            }
            Err(_) => log::error!("Click queue lock poisoned"),
        }
    }
}

pub struct ClickEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: f32,
    trigger: ClickTrigger,
    pub volume: AtomicF32,
}

impl ClickEngine {
    /// Open the default output device
    pub fn new(volume: f32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();
        log::debug!("Audio config: {config:?}, format {sample_format:?}");

        let (producer, consumer) = create_click_channel(CLICK_QUEUE_CAPACITY);
        let volume = AtomicF32::new(volume.clamp(0.0, 1.0));

        let metronome = Metronome::new(sample_rate);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                consumer,
                metronome,
                volume.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                consumer,
                metronome,
                volume.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                consumer,
                metronome,
                volume.clone(),
            ),
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            trigger: ClickTrigger {
                queue: Arc::new(Mutex::new(producer)),
            },
            volume,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Handle for other threads to request clicks
    pub fn trigger(&self) -> ClickTrigger {
        self.trigger.clone()
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut clicks: ClickConsumer,
        mut metronome: Metronome,
        volume: AtomicF32,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        // Click waiting for its scheduled time
        let mut pending: Option<ClickNote> = None;

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocations, no I/O, no blocking locks in here

                    if pending.is_none() {
                        pending = clicks.try_pop();
                    }
                    if let Some(click) = pending
                        && click.scheduled_at <= Instant::now()
                    {
                        metronome.trigger_click(&click);
                        pending = None;
                    }

                    metronome.set_volume(volume.get());
                    for frame in data.chunks_mut(channels) {
                        write_mono_to_interleaved_frame(metronome.process_sample(), frame);
                    }
                },
                move |err| {
                    log::error!("Audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }
}
