use super::engine::{EngineError, EngineEvent, PlaybackEngine};
use super::AudioConfig;
use reqwest::blocking::Client;
use reqwest::header::{RANGE, USER_AGENT};
use reqwest::StatusCode;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

// Googlevideo throttles plain full-length GETs, ranged reads come back at full speed
const FETCH_CHUNK_BYTES: u64 = 4 * 1024 * 1024;
const STATUS_POLL: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
enum EngineCmd {
    Load { id: u64, address: String },
    Play,
    TogglePause,
    Stop,
    Seek(Duration),
    Quit,
}

/// What the audio thread last saw; read by the UI thread for position polling.
#[derive(Debug, Clone, Default)]
struct EngineStatus {
    state: PlaybackState,
    loaded: bool,
    elapsed: Duration,
    total: Option<Duration>,
}

/// rodio-backed engine. The output stream is not `Send`, so it lives on a
/// dedicated thread that owns the sink and takes commands over a channel.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    status: Arc<Mutex<EngineStatus>>,
    latest: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl RodioEngine {
    pub fn new(config: AudioConfig, events: UnboundedSender<EngineEvent>) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(EngineStatus::default()));
        let latest = Arc::new(AtomicU64::new(0));

        let thread_status = Arc::clone(&status);
        let thread_latest = Arc::clone(&latest);
        let join = thread::Builder::new()
            .name("tubepipe-audio".to_string())
            .spawn(move || audio_thread(config, rx, thread_status, thread_latest, events, ready_tx))
            .map_err(|e| EngineError::Output(e.to_string()))?;

        // Surface "no output device" here instead of on the first play
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = join.join();
                return Err(EngineError::Output(reason));
            }
            Err(_) => return Err(EngineError::Disconnected),
        }

        Ok(Self {
            tx,
            status,
            latest,
            join: Some(join),
        })
    }

    fn send(&self, cmd: EngineCmd) -> Result<(), EngineError> {
        self.tx.send(cmd).map_err(|_| EngineError::Disconnected)
    }

    fn status(&self) -> Result<MutexGuard<'_, EngineStatus>, EngineError> {
        self.status.lock().map_err(|_| EngineError::Poisoned)
    }

    fn bump(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stop the audio thread and give it a moment to release the output
    /// device. A thread stuck in a stream request is left behind.
    pub fn shutdown(&mut self) {
        // Abandons any fetch in progress
        self.bump();
        let _ = self.send(EngineCmd::Quit);
        if let Some(handle) = self.join.take() {
            if !join_within(handle, SHUTDOWN_GRACE) {
                warn!("Audio thread still busy after {:?}, not waiting for it", SHUTDOWN_GRACE);
            }
        }
    }
}

/// Join `handle` if it finishes within `limit`, otherwise detach it.
fn join_within(handle: JoinHandle<()>, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let _ = handle.join();
    true
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl PlaybackEngine for RodioEngine {
    fn load(&mut self, address: &str) -> Result<(), EngineError> {
        let id = self.bump();
        self.send(EngineCmd::Load {
            id,
            address: address.to_string(),
        })
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.send(EngineCmd::Play)
    }

    fn toggle_pause(&mut self) -> Result<(), EngineError> {
        self.send(EngineCmd::TogglePause)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.bump();
        self.send(EngineCmd::Stop)
    }

    fn position(&self) -> Result<f64, EngineError> {
        let status = self.status()?;
        match status.total {
            Some(total) if !total.is_zero() => {
                Ok((status.elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0))
            }
            _ => Ok(0.0),
        }
    }

    fn set_position(&mut self, fraction: f64) -> Result<(), EngineError> {
        let target = {
            let status = self.status()?;
            if !status.loaded {
                return Err(EngineError::NothingLoaded);
            }
            let total = status
                .total
                .ok_or_else(|| EngineError::Seek("stream length unknown".to_string()))?;
            total.mul_f64(fraction.clamp(0.0, 1.0))
        };
        self.send(EngineCmd::Seek(target))
    }

    fn elapsed_millis(&self) -> Result<u64, EngineError> {
        Ok(self.status()?.elapsed.as_millis() as u64)
    }

    fn total_millis(&self) -> Result<u64, EngineError> {
        Ok(self.status()?.total.map(|d| d.as_millis() as u64).unwrap_or(0))
    }

    fn current_load(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

fn audio_thread(
    config: AudioConfig,
    rx: Receiver<EngineCmd>,
    status: Arc<Mutex<EngineStatus>>,
    latest: Arc<AtomicU64>,
    events: UnboundedSender<EngineEvent>,
    ready: Sender<Result<(), String>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let client = match Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .timeout(REQUEST_TIMEOUT)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not build HTTP client: {}", e);
            let _ = events.send(EngineEvent::Error {
                load: latest.load(Ordering::SeqCst),
                reason: format!("HTTP client: {e}"),
            });
            return;
        }
    };

    let mut sink: Option<Sink> = None;
    // Load id of whatever is in the sink
    let mut active_load = 0;

    let update = |f: &mut dyn FnMut(&mut EngineStatus)| {
        if let Ok(mut guard) = status.lock() {
            f(&mut guard);
        }
    };

    loop {
        match rx.recv_timeout(STATUS_POLL) {
            Ok(EngineCmd::Load { id, address }) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                update(&mut |s| *s = EngineStatus::default());

                let superseded = || latest.load(Ordering::SeqCst) != id;
                if superseded() {
                    debug!("Skipping load {} before fetching, a newer command is queued", id);
                    continue;
                }

                let source = match fetch_and_decode(&client, &address, &config.user_agent, &superseded) {
                    Ok(source) => source,
                    Err(_) if superseded() => {
                        debug!("Load {} abandoned mid-fetch", id);
                        continue;
                    }
                    Err(reason) => {
                        warn!("Failed to load stream: {}", reason);
                        let _ = events.send(EngineEvent::Error { load: id, reason });
                        continue;
                    }
                };

                let new_sink = match Sink::try_new(&handle) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Failed to create sink: {}", e);
                        let _ = events.send(EngineEvent::Error {
                            load: id,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                let total = source.total_duration();
                new_sink.set_volume(config.volume);
                new_sink.pause();
                new_sink.append(source);
                sink = Some(new_sink);
                active_load = id;

                debug!("Stream loaded, length {:?}", total);
                update(&mut |s| {
                    s.loaded = true;
                    s.state = PlaybackState::Paused;
                    s.total = total;
                });
            }
            Ok(EngineCmd::Play) => {
                if let Some(s) = sink.as_ref() {
                    s.play();
                    update(&mut |st| st.state = PlaybackState::Playing);
                }
            }
            Ok(EngineCmd::TogglePause) => {
                if let Some(s) = sink.as_ref() {
                    let next = if s.is_paused() {
                        s.play();
                        PlaybackState::Playing
                    } else {
                        s.pause();
                        PlaybackState::Paused
                    };
                    update(&mut |st| st.state = next);
                }
            }
            Ok(EngineCmd::Stop) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                update(&mut |st| {
                    st.state = PlaybackState::Stopped;
                    st.elapsed = Duration::ZERO;
                });
            }
            Ok(EngineCmd::Seek(target)) => {
                if let Some(s) = sink.as_ref() {
                    if let Err(e) = s.try_seek(target) {
                        warn!("Seek to {:?} failed: {:?}", target, e);
                    }
                }
            }
            Ok(EngineCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                info!("Audio thread shutting down");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        // Refresh the snapshot and notice the end of the stream
        let Some(s) = sink.as_ref() else { continue };
        let elapsed = s.get_pos();
        let finished = s.empty();
        let mut ended = false;
        update(&mut |st| {
            st.elapsed = elapsed;
            if finished && st.state == PlaybackState::Playing {
                st.state = PlaybackState::Stopped;
                ended = true;
            }
        });
        if ended {
            sink = None;
            debug!("End of stream reached");
            let _ = events.send(EngineEvent::EndReached { load: active_load });
        }
    }
}

fn fetch_and_decode(
    client: &Client,
    address: &str,
    user_agent: &str,
    cancelled: &dyn Fn() -> bool,
) -> Result<Decoder<Cursor<Vec<u8>>>, String> {
    let bytes = fetch_stream(client, address, user_agent, FETCH_CHUNK_BYTES, cancelled)?;
    info!("Fetched {} bytes of audio", bytes.len());
    Decoder::new(Cursor::new(bytes)).map_err(|e| format!("unsupported or corrupted stream: {e}"))
}

/// Read the whole stream in `chunk`-sized ranged requests. `cancelled` is
/// checked before each request.
fn fetch_stream(
    client: &Client,
    address: &str,
    user_agent: &str,
    chunk: u64,
    cancelled: &dyn Fn() -> bool,
) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();

    loop {
        if cancelled() {
            return Err("cancelled".to_string());
        }
        let start = buffer.len() as u64;
        let end = start + chunk - 1;
        let response = client
            .get(address)
            .header(USER_AGENT, user_agent)
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE && start > 0 {
            break;
        }
        if !status.is_success() {
            return Err(format!("stream request returned {status}"));
        }

        let body = response.bytes().map_err(|e| format!("read failed: {e}"))?;
        let body_len = body.len() as u64;
        buffer.extend_from_slice(&body);

        // A server that ignores Range sends everything at once
        if status != StatusCode::PARTIAL_CONTENT || body_len < chunk {
            break;
        }
    }

    if buffer.is_empty() {
        return Err("stream was empty".to_string());
    }
    Ok(buffer)
}
