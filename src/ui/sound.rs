/// Sound engine: procedural sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_star: Arc<Vec<u8>>,
        sfx_vortex: Arc<Vec<u8>>,
        sfx_teleport: Arc<Vec<u8>>,
        sfx_goal: Arc<Vec<u8>>,
        sfx_respawn: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_star: Arc::new(make_wav(&gen_star())),
                sfx_vortex: Arc::new(make_wav(&gen_vortex())),
                sfx_teleport: Arc::new(make_wav(&gen_teleport())),
                sfx_goal: Arc::new(make_wav(&gen_goal())),
                sfx_respawn: Arc::new(make_wav(&gen_respawn())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_star(&self) { self.play(&self.sfx_star); }
        pub fn play_vortex(&self) { self.play(&self.sfx_vortex); }
        pub fn play_teleport(&self) { self.play(&self.sfx_teleport); }
        pub fn play_goal(&self) { self.play(&self.sfx_goal); }
        pub fn play_respawn(&self) { self.play(&self.sfx_respawn); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Star: bright two-note sparkle E6→B6
    fn gen_star() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[1319.0_f32, 1976.0] {
            let n = sample_count(0.05);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Vortex: wobbling tone spiralling down, 800Hz → 120Hz
    fn gen_vortex() -> Vec<f32> {
        let n = sample_count(0.5);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let wobble = (t * 14.0 * TAU).sin() * 60.0;
                let freq = 800.0 - t * 680.0 + wobble;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (phase * TAU).sin() * env * 0.3
            })
            .collect()
    }

    /// Teleport: fall then rise, like sinking through and popping out
    fn gen_teleport() -> Vec<f32> {
        let n = sample_count(0.4);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 300.0 + (t * 2.0 - 1.0).abs() * 900.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = (t * std::f32::consts::PI).sin();
                let tremolo = 0.75 + 0.25 * (t * 30.0 * TAU).sin();
                (phase * TAU).sin() * env * tremolo * 0.25
            })
            .collect()
    }

    /// Goal: ascending fanfare C5→E5→G5→C6 with a held last note
    fn gen_goal() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = sample_count(0.1);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let n = sample_count(0.25);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * 1047.0 * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Respawn: short soft pop
    fn gen_respawn() -> Vec<f32> {
        let n = sample_count(0.06);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                (t * 660.0 * TAU).sin() * env * 0.2
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_star(&self) {}
    pub fn play_vortex(&self) {}
    pub fn play_teleport(&self) {}
    pub fn play_goal(&self) {}
    pub fn play_respawn(&self) {}
}
