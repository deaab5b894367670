use std::{
    collections::VecDeque,
    io,
    time::{Duration, Instant},
};

use chip::{
    definitions::keyboard,
    devices::{InputCommands, InputEvent},
};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
};

use crate::keymap::keymap;

/// How long a key counts as held, if the terminal never reports releases.
const HOLD: Duration = Duration::from_millis(150);

/// How long a blocking wait sleeps on the terminal at once.
const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Turns the terminal key events into keypad events.
///
/// Most terminals only report presses, in that case every key is released again
/// once it was not repeated for a while. As soon as a single release is reported,
/// releases are left to the terminal.
#[derive(Debug)]
pub struct KeyTracker {
    held: [Option<Instant>; keyboard::SIZE],
    reports_release: bool,
    hold: Duration,
}

impl KeyTracker {
    pub fn new(hold: Duration) -> Self {
        Self {
            held: [None; keyboard::SIZE],
            reports_release: false,
            hold,
        }
    }

    pub fn translate(&mut self, event: Event, now: Instant) -> Option<InputEvent> {
        let KeyEvent {
            code,
            modifiers,
            kind,
            ..
        } = match event {
            Event::Key(key) => key,
            _ => return None,
        };

        match code {
            KeyCode::Esc => return Some(InputEvent::Quit),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(InputEvent::Quit)
            }
            _ => {}
        }

        let key = match code {
            KeyCode::Char(c) => keymap(c),
            _ => None,
        };
        let key = match key {
            Some(key) => key,
            None => {
                log::warn!("ignored key {:?}", code);
                return None;
            }
        };

        let held = &mut self.held[key as usize];
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let was_held = held.replace(now).is_some();
                // repeats only keep the key alive
                (!was_held).then(|| InputEvent::Key { key, pressed: true })
            }
            KeyEventKind::Release => {
                if !self.reports_release {
                    log::info!("the terminal reports key releases");
                    self.reports_release = true;
                }
                *held = None;
                Some(InputEvent::Key {
                    key,
                    pressed: false,
                })
            }
        }
    }

    /// Releases the next key that was held for too long.
    pub fn expire(&mut self, now: Instant) -> Option<InputEvent> {
        if self.reports_release {
            return None;
        }
        let hold = self.hold;
        let key = self.held.iter().position(|pressed| match pressed {
            Some(since) => now.saturating_duration_since(*since) >= hold,
            None => false,
        })?;
        self.held[key] = None;
        Some(InputEvent::Key {
            key: key as u8,
            pressed: false,
        })
    }
}

/// Reads the keypad from the terminal, requires the terminal to be in raw mode.
pub struct TerminalInput {
    tracker: KeyTracker,
    pending: VecDeque<InputEvent>,
    enhanced: bool,
}

impl TerminalInput {
    pub fn new() -> Self {
        // ask for release events, terminals without support ignore this
        let enhanced = match execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        ) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("key releases are not available: {}", err);
                false
            }
        };
        Self {
            tracker: KeyTracker::new(HOLD),
            pending: VecDeque::new(),
            enhanced,
        }
    }
}

impl InputCommands for TerminalInput {
    fn poll(&mut self) -> io::Result<Option<InputEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        while event::poll(Duration::ZERO)? {
            let event = event::read()?;
            if let Some(event) = self.tracker.translate(event, Instant::now()) {
                return Ok(Some(event));
            }
        }
        Ok(self.tracker.expire(Instant::now()))
    }

    fn wait(&mut self) -> io::Result<InputEvent> {
        loop {
            if let Some(event) = self.poll()? {
                return Ok(event);
            }
            event::poll(WAIT_INTERVAL)?;
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if self.enhanced {
            if let Err(err) = execute!(io::stdout(), PopKeyboardEnhancementFlags) {
                log::warn!("unable to reset the keyboard flags: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(c: char, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_press_is_mapped() {
        let mut tracker = KeyTracker::new(HOLD);
        let now = Instant::now();

        assert_eq!(
            tracker.translate(key_event('w', KeyEventKind::Press), now),
            Some(InputEvent::Key {
                key: 0x5,
                pressed: true
            })
        );
        // the repeat is swallowed
        assert_eq!(
            tracker.translate(key_event('w', KeyEventKind::Press), now),
            None
        );
    }

    #[test]
    fn test_unmapped_key() {
        let mut tracker = KeyTracker::new(HOLD);
        assert_eq!(
            tracker.translate(key_event('p', KeyEventKind::Press), Instant::now()),
            None
        );
    }

    #[test]
    fn test_quit() {
        let mut tracker = KeyTracker::new(HOLD);
        let now = Instant::now();

        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(tracker.translate(esc, now), Some(InputEvent::Quit));

        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(tracker.translate(ctrl_c, now), Some(InputEvent::Quit));

        // without control it is the keypad key B
        assert_eq!(
            tracker.translate(key_event('c', KeyEventKind::Press), now),
            Some(InputEvent::Key {
                key: 0xB,
                pressed: true
            })
        );
    }

    #[test]
    fn test_auto_release() {
        let mut tracker = KeyTracker::new(HOLD);
        let start = Instant::now();

        tracker.translate(key_event('x', KeyEventKind::Press), start);
        assert_eq!(tracker.expire(start + HOLD / 2), None);

        // a repeat keeps the key held
        tracker.translate(key_event('x', KeyEventKind::Press), start + HOLD / 2);
        assert_eq!(tracker.expire(start + HOLD), None);

        assert_eq!(
            tracker.expire(start + HOLD * 2),
            Some(InputEvent::Key {
                key: 0x0,
                pressed: false
            })
        );
        assert_eq!(tracker.expire(start + HOLD * 3), None);
    }

    #[test]
    fn test_reported_release() {
        let mut tracker = KeyTracker::new(HOLD);
        let start = Instant::now();

        tracker.translate(key_event('v', KeyEventKind::Press), start);
        assert_eq!(
            tracker.translate(key_event('v', KeyEventKind::Release), start),
            Some(InputEvent::Key {
                key: 0xF,
                pressed: false
            })
        );

        // from now on only the terminal releases keys
        tracker.translate(key_event('v', KeyEventKind::Press), start);
        assert_eq!(tracker.expire(start + HOLD * 10), None);
    }
}
