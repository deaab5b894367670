use std::{
    io::{self, Stdout, Write},
    time::Instant,
};

use chip::{definitions::sound, devices::SpeakerCommands, sound::BeepCounter};

/// The terminal bell character.
const BELL: &[u8] = b"\x07";

/// Rings the terminal bell whenever the beep starts. The countdown is consumed
/// in real time, as there is no audio output doing it.
pub struct TerminalSpeaker<W: Write = Stdout> {
    counter: BeepCounter,
    out: W,
    last_update: Instant,
    audible: bool,
}

impl TerminalSpeaker {
    pub fn new(counter: BeepCounter) -> Self {
        Self::with_output(counter, io::stdout())
    }
}

impl<W: Write> TerminalSpeaker<W> {
    pub fn with_output(counter: BeepCounter, out: W) -> Self {
        Self {
            counter,
            out,
            last_update: Instant::now(),
            audible: false,
        }
    }

    fn update_at(&mut self, now: Instant) -> io::Result<()> {
        let elapsed = now.saturating_duration_since(self.last_update);
        self.last_update = now;

        let audible = self.counter.remaining() > 0;
        if audible && !self.audible {
            log::debug!("beep");
            self.out.write_all(BELL)?;
            self.out.flush()?;
        }
        self.audible = audible;

        let samples = elapsed.as_micros() * u128::from(sound::SAMPLE_RATE) / 1_000_000;
        self.counter.consume(samples as usize);
        Ok(())
    }
}

impl<W: Write> SpeakerCommands for TerminalSpeaker<W> {
    fn update(&mut self) -> io::Result<()> {
        self.update_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_bell_on_start_only() {
        let counter = BeepCounter::new();
        let start = Instant::now();
        let mut speaker = TerminalSpeaker::with_output(counter.clone(), Vec::new());
        speaker.last_update = start;

        speaker.update_at(start).unwrap();
        assert!(speaker.out.is_empty());

        counter.arm(sound::BEEP_SAMPLES);
        speaker.update_at(start).unwrap();
        assert_eq!(speaker.out, BELL);

        // still the same beep
        speaker.update_at(start + Duration::from_millis(10)).unwrap();
        assert_eq!(speaker.out, BELL);
    }

    #[test]
    fn test_countdown_in_real_time() {
        let counter = BeepCounter::new();
        let start = Instant::now();
        let mut speaker = TerminalSpeaker::with_output(counter.clone(), Vec::new());
        speaker.last_update = start;

        counter.arm(sound::BEEP_SAMPLES);
        speaker.update_at(start).unwrap();

        // 10 ms are 480 samples
        speaker.update_at(start + Duration::from_millis(10)).unwrap();
        assert_eq!(counter.remaining(), sound::BEEP_SAMPLES - 480);

        // the beep is over after 62.5 ms
        speaker.update_at(start + Duration::from_millis(100)).unwrap();
        assert_eq!(counter.remaining(), 0);

        speaker.update_at(start + Duration::from_millis(110)).unwrap();
        counter.arm(sound::BEEP_SAMPLES);
        speaker.update_at(start + Duration::from_millis(120)).unwrap();
        assert_eq!(speaker.out, [BELL, BELL].concat());
    }
}
