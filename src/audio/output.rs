//! The audio output primitive the engine drives.
//!
//! `AudioOutput` is the seam between playback policy and the device. The
//! engine only ever talks to this trait; `RodioOutput` implements it on top
//! of a `rodio` sink.

use std::fs::File;
use std::io::BufReader;
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::{PlayerError, Result};
use crate::library::Track;

pub trait AudioOutput {
    /// Open `track` paused at `start_at`, replacing whatever was open.
    fn open(&mut self, track: &Track, start_at: Duration) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Close the current track. Nothing is open afterwards.
    fn stop(&mut self);
    /// Reposition within the open track, keeping the paused/playing state.
    fn seek(&mut self, position: Duration) -> Result<()>;
    /// Device gain in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// Duration reported by the decoder, when known.
    fn duration(&self) -> Option<Duration>;
    /// True once the open track has played to its end.
    fn is_finished(&self) -> bool;

    /// Ramp the volume down over `fade` and stop.
    fn fade_out(&mut self, fade: Duration) {
        let _ = fade;
        self.stop();
    }
}

struct OpenTrack {
    track: Track,
    sink: Sink,
    duration: Option<Duration>,
}

pub struct RodioOutput {
    stream: OutputStream,
    current: Option<OpenTrack>,
    volume: f32,
    paused: bool,
    // Position bookkeeping: `accumulated` holds time played before the last
    // resume, `started_at` is set while playing.
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl RodioOutput {
    /// Open the default output device. Must be called on the thread that
    /// will use the output.
    pub fn open_default() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
            PlayerError::Output(format!("audio output device: {e}"))
        })?;
        // rodio logs to stderr when OutputStream is dropped; noisy in a terminal app.
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            current: None,
            volume: 1.0,
            paused: true,
            started_at: None,
            accumulated: Duration::ZERO,
        })
    }

    fn create_sink_at(&self, track: &Track, start_at: Duration) -> Result<(Sink, Option<Duration>)> {
        let fail = |reason: String| PlayerError::Playback {
            track: track.id(),
            reason,
        };
        let file = File::open(track.path())
            .map_err(|e| fail(format!("cannot open {}: {e}", track.path().display())))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| fail(format!("cannot decode {}: {e}", track.path().display())))?;
        let duration = decoder.total_duration();
        // `skip_duration` is the seeking primitive; Duration::ZERO is fine.
        let source = decoder.skip_duration(start_at);

        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);
        sink.pause();
        Ok((sink, duration))
    }
}

impl AudioOutput for RodioOutput {
    fn open(&mut self, track: &Track, start_at: Duration) -> Result<()> {
        let (sink, duration) = self.create_sink_at(track, start_at)?;
        if let Some(old) = self.current.take() {
            old.sink.stop();
        }
        debug!(track = %track.display(), start_at = ?start_at, "opened track");
        self.current = Some(OpenTrack {
            track: track.clone(),
            sink,
            duration,
        });
        self.paused = true;
        self.started_at = None;
        self.accumulated = start_at;
        Ok(())
    }

    fn play(&mut self) {
        let Some(cur) = &self.current else {
            return;
        };
        cur.sink.play();
        if self.paused {
            self.started_at = Some(Instant::now());
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        let Some(cur) = &self.current else {
            return;
        };
        cur.sink.pause();
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.paused = true;
    }

    fn stop(&mut self) {
        if let Some(cur) = self.current.take() {
            cur.sink.stop();
        }
        self.paused = true;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let Some(track) = self.current.as_ref().map(|c| c.track.clone()) else {
            return Ok(());
        };
        let was_paused = self.paused;
        // Rebuild the sink and skip into the file.
        self.open(&track, position)?;
        if !was_paused {
            self.play();
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(cur) = &self.current {
            cur.sink.set_volume(self.volume);
        }
    }

    fn position(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    fn duration(&self) -> Option<Duration> {
        self.current.as_ref().and_then(|c| c.duration)
    }

    fn is_finished(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| !self.paused && c.sink.empty())
    }

    fn fade_out(&mut self, fade: Duration) {
        if let Some(cur) = &self.current {
            if !self.paused && !fade.is_zero() {
                let steps: u32 = 20;
                let step = (fade / steps).max(Duration::from_millis(1));
                for i in 1..=steps {
                    let t = i as f32 / steps as f32;
                    cur.sink.set_volume(self.volume * (1.0 - t));
                    thread::sleep(step);
                }
            }
            cur.sink.set_volume(0.0);
        }
        self.stop();
    }
}
