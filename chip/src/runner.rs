use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    chip8::ChipSet,
    definitions::{cpu, timer},
    devices::{DisplayCommands, InputCommands, InputEvent, SpeakerCommands},
    timer::{TickDivider, TimerCallback},
    ProcessError, RunError,
};

/// The runtime settings of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// instructions executed per second
    pub cpu_hz: u64,
    /// timer decrements per second
    pub timer_hz: u64,
    /// seed for `CXNN`, a random one is drawn if missing
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_hz: cpu::HERTZ,
            timer_hz: timer::HERTZ,
            seed: None,
        }
    }
}

impl Config {
    /// The time a single cycle is supposed to take.
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.cpu_hz.max(1))
    }

    pub fn divider(&self) -> TickDivider {
        TickDivider::new(self.cpu_hz, self.timer_hz)
    }
}

/// Drives the machine: feeds it the input, executes the instructions, ticks the
/// timers and hands the frames and beeps to the devices.
pub struct Runner<S, D, K, P>
where
    S: TimerCallback,
    D: DisplayCommands,
    K: InputCommands,
    P: SpeakerCommands,
{
    chip: ChipSet<S>,
    display: D,
    input: K,
    speaker: P,
    divider: TickDivider,
    interval: Duration,
}

impl<S, D, K, P> Runner<S, D, K, P>
where
    S: TimerCallback,
    D: DisplayCommands,
    K: InputCommands,
    P: SpeakerCommands,
{
    pub fn new(mut chip: ChipSet<S>, display: D, input: K, speaker: P, config: &Config) -> Self {
        if let Some(seed) = config.seed {
            log::info!("using the random seed {}", seed);
            chip.seed_rng(seed);
        }
        Self {
            chip,
            display,
            input,
            speaker,
            divider: config.divider(),
            interval: config.cycle_interval(),
        }
    }

    pub fn chip(&self) -> &ChipSet<S> {
        &self.chip
    }

    /// Runs a single cycle, returns false once the host asked to stop.
    ///
    /// While the machine waits for a key, the cycle blocks on the input instead
    /// of executing anything.
    pub fn cycle(&mut self) -> Result<bool, RunError> {
        if self.chip.is_waiting() {
            let event = self.input.wait()?;
            if !self.handle(event)? {
                return Ok(false);
            }
        } else {
            while let Some(event) = self.input.poll()? {
                if !self.handle(event)? {
                    return Ok(false);
                }
            }

            self.chip.step()?;

            // the timers stand still while waiting for a key
            if !self.chip.is_waiting() && self.divider.cycle() {
                self.chip.tick_timers();
            }
        }

        if let Some(frame) = self.chip.take_frame() {
            self.display.display(frame)?;
        }
        self.speaker.update()?;

        Ok(true)
    }

    /// Cycles at the configured rate until the host asks to stop or an error occurs.
    pub fn run(&mut self) -> Result<(), RunError> {
        log::info!(
            "running {} with a cycle every {:?}",
            self.chip.get_name(),
            self.interval
        );
        let mut last_cycle = Instant::now();
        while self.cycle()? {
            let elapsed = last_cycle.elapsed();
            if self.interval > elapsed {
                thread::sleep(self.interval - elapsed);
            }
            last_cycle = Instant::now();
        }
        log::info!("stopped {}", self.chip.get_name());
        Ok(())
    }

    fn handle(&mut self, event: InputEvent) -> Result<bool, ProcessError> {
        match event {
            InputEvent::Quit => Ok(false),
            InputEvent::Key { key, pressed } => {
                self.chip.set_key(key, pressed)?;
                Ok(true)
            }
        }
    }
}

/// Will run the machine with the given devices until the host asks to stop.
pub fn run<S, D, K, P>(
    chip: ChipSet<S>,
    display: D,
    input: K,
    speaker: P,
    config: &Config,
) -> Result<(), RunError>
where
    S: TimerCallback,
    D: DisplayCommands,
    K: InputCommands,
    P: SpeakerCommands,
{
    Runner::new(chip, display, input, speaker, config).run()
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        devices::{MockDisplayCommands, MockInputCommands, MockSpeakerCommands},
        resources::Rom,
        timer::NoCallback,
    };

    type TestRunner =
        Runner<NoCallback, MockDisplayCommands, MockInputCommands, MockSpeakerCommands>;

    fn setup_runner(
        program: &[u8],
        display: MockDisplayCommands,
        input: MockInputCommands,
        config: &Config,
    ) -> TestRunner {
        let rom = Rom::new("TEST", program.into()).unwrap();
        let mut speaker = MockSpeakerCommands::new();
        speaker.expect_update().returning(|| Ok(()));
        Runner::new(ChipSet::new(&rom), display, input, speaker, config)
    }

    fn idle_input() -> MockInputCommands {
        let mut input = MockInputCommands::new();
        input.expect_poll().returning(|| Ok(None));
        input.expect_wait().never();
        input
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cpu_hz, 500);
        assert_eq!(config.timer_hz, 60);
        assert_eq!(config.cycle_interval(), Duration::from_millis(2));
        assert_eq!(config.divider().cycles_per_tick(), 8);
    }

    #[test]
    fn test_quit_stops_before_stepping() {
        let mut input = MockInputCommands::new();
        input.expect_poll().times(1).returning(|| Ok(Some(InputEvent::Quit)));
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        let mut runner = setup_runner(&[0x00, 0xE0], display, input, &Config::default());

        assert!(!runner.cycle().unwrap());
        assert_eq!(runner.chip().get_program_counter(), cpu::PROGRAM_COUNTER);
    }

    #[test]
    fn test_clear_and_loop() {
        let mut display = MockDisplayCommands::new();
        // both clears change the screen, the jump does not
        display
            .expect_display()
            .times(2)
            .returning(|frame| {
                assert!(frame.pixels().iter().all(|&p| p == 0));
                Ok(())
            });

        let mut runner = setup_runner(
            &[0x00, 0xE0, 0x12, 0x00],
            display,
            idle_input(),
            &Config::default(),
        );

        for _ in 0..3 {
            assert!(runner.cycle().unwrap());
            let pc = runner.chip().get_program_counter();
            assert!((0x200..=0x202).contains(&pc));
        }
    }

    #[test]
    fn test_wait_for_key() {
        let mut input = MockInputCommands::new();
        input.expect_poll().returning(|| Ok(None));
        input.expect_wait().times(1).returning(|| {
            Ok(InputEvent::Key {
                key: 0x5,
                pressed: true,
            })
        });
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        // F30A 1202
        let mut runner = setup_runner(
            &[0xF3, 0x0A, 0x12, 0x02],
            display,
            input,
            &Config::default(),
        );

        assert!(runner.cycle().unwrap());
        assert!(runner.chip().is_waiting());

        assert!(runner.cycle().unwrap());
        assert!(!runner.chip().is_waiting());
        assert_eq!(runner.chip().get_registers()[0x3], 0x5);
        // the key was released again after it was consumed
        assert!(!runner.chip().get_keyboard()[0x5]);

        assert!(runner.cycle().unwrap());
        assert_eq!(runner.chip().get_program_counter(), 0x202);
    }

    #[test]
    fn test_timers_follow_divider() {
        let config = Config {
            cpu_hz: 60,
            timer_hz: 60,
            seed: None,
        };
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        // 6A05 FA15 1204
        let mut runner = setup_runner(
            &[0x6A, 0x05, 0xFA, 0x15, 0x12, 0x04],
            display,
            idle_input(),
            &config,
        );

        runner.cycle().unwrap();
        runner.cycle().unwrap();
        assert_eq!(runner.chip().get_delay_timer(), 4);

        for _ in 0..10 {
            runner.cycle().unwrap();
        }
        assert_eq!(runner.chip().get_delay_timer(), 0);
    }

    #[test]
    fn test_key_events_reach_keypad() {
        let mut events = vec![
            Some(InputEvent::Key {
                key: 0xA,
                pressed: true,
            }),
            None,
        ]
        .into_iter();
        let mut input = MockInputCommands::new();
        input
            .expect_poll()
            .returning(move || Ok(events.next().flatten()));
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        let mut runner = setup_runner(&[0x12, 0x00], display, input, &Config::default());

        runner.cycle().unwrap();
        assert!(runner.chip().get_keyboard()[0xA]);
    }

    #[test]
    fn test_invalid_key_is_fatal() {
        let mut input = MockInputCommands::new();
        input.expect_poll().returning(|| {
            Ok(Some(InputEvent::Key {
                key: 0x10,
                pressed: true,
            }))
        });
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        let mut runner = setup_runner(&[0x12, 0x00], display, input, &Config::default());

        assert!(matches!(
            runner.cycle(),
            Err(RunError::Process(ProcessError::InvalidKey(0x10)))
        ));
    }

    #[test]
    fn test_invalid_opcode_is_fatal() {
        let mut display = MockDisplayCommands::new();
        display.expect_display().never();

        let mut runner = setup_runner(&[0x01, 0x23], display, idle_input(), &Config::default());

        assert!(matches!(runner.cycle(), Err(RunError::Process(_))));
    }

    #[test]
    fn test_device_error_is_fatal() {
        let mut display = MockDisplayCommands::new();
        display
            .expect_display()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Other, "gone")));

        let mut runner = setup_runner(&[0x00, 0xE0], display, idle_input(), &Config::default());

        assert!(matches!(runner.cycle(), Err(RunError::Device(_))));
    }

    #[test]
    fn test_run_until_quit() {
        let mut polls = 0;
        let mut input = MockInputCommands::new();
        input.expect_poll().returning(move || {
            polls += 1;
            if polls > 3 {
                Ok(Some(InputEvent::Quit))
            } else {
                Ok(None)
            }
        });
        let mut display = MockDisplayCommands::new();
        display.expect_display().returning(|_| Ok(()));

        let config = Config {
            cpu_hz: 1000,
            ..Config::default()
        };
        let mut runner = setup_runner(&[0x00, 0xE0, 0x12, 0x00], display, input, &config);

        assert!(runner.run().is_ok());
    }
}
