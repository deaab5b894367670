//! The beep: the sound timer arms a countdown measured in output samples,
//! which the audio side consumes while synthesizing the tone.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{definitions::sound, timer::TimerCallback};

/// The remaining length of the tone in samples, shared between the machine
/// and the audio output.
#[derive(Debug, Clone, Default)]
pub struct BeepCounter {
    remaining: Arc<AtomicUsize>,
}

impl BeepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the tone running for the given amount of samples from now on.
    pub fn arm(&self, samples: usize) {
        self.remaining.store(samples, Ordering::Release);
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Takes up to `samples` from the countdown and returns how many were left to take.
    pub fn consume(&self, samples: usize) -> usize {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                Some(left.saturating_sub(samples))
            })
            // the closure never refuses an update
            .unwrap_or_else(|left| left);
        previous.min(samples)
    }
}

/// The sound timer callback, arms the beep every time the timer counts down.
#[derive(Debug, Clone)]
pub struct Beeper {
    counter: BeepCounter,
}

impl Beeper {
    pub fn new(counter: BeepCounter) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &BeepCounter {
        &self.counter
    }
}

impl TimerCallback for Beeper {
    fn handle(&mut self) {
        log::trace!("beep armed for {} samples", sound::BEEP_SAMPLES);
        self.counter.arm(sound::BEEP_SAMPLES);
    }
}

/// Synthesizes the beep as a sine wave for as long as the counter allows.
#[derive(Debug)]
pub struct ToneGenerator {
    counter: BeepCounter,
    phase: f32,
}

impl ToneGenerator {
    pub fn new(counter: BeepCounter) -> Self {
        Self {
            counter,
            phase: 0.0,
        }
    }

    /// Fills the buffer with the tone, followed by silence once the countdown ran out.
    pub fn fill(&mut self, out: &mut [f32]) {
        let audible = self.counter.consume(out.len());
        let (tone, silence) = out.split_at_mut(audible);

        for sample in tone.iter_mut() {
            *sample = self.phase.sin() * sound::AMPLITUDE;
            self.phase = (self.phase + sound::PHASE_STEP) % std::f32::consts::TAU;
        }
        silence.iter_mut().for_each(|sample| *sample = 0.0);
    }
}
