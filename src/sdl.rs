//! The sdl front end: a scaled window and a real tone.
use std::io;

use anyhow::anyhow;
use chip::{
    chip8::ChipSet,
    definitions::{display, sound},
    devices::{DisplayCommands, Framebuffer, InputCommands, InputEvent, SpeakerCommands},
    sound::{BeepCounter, ToneGenerator},
    timer::TimerCallback,
    Config,
};
use sdl2::{
    audio::{AudioCallback, AudioDevice, AudioSpecDesired},
    event::Event,
    keyboard::Keycode,
    pixels::Color,
    rect::Rect,
    render::WindowCanvas,
    EventPump, Sdl,
};

use crate::keymap::keymap;

fn sdl_error(err: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// The screen drawn white on black, every pixel scaled up to a square.
pub struct SdlDisplay {
    canvas: WindowCanvas,
    scale: u32,
}

impl SdlDisplay {
    pub fn new(sdl: &Sdl, title: &str, scale: u32) -> anyhow::Result<Self> {
        let video = sdl.video().map_err(|err| anyhow!("No video available: {}", err))?;
        let window = video
            .window(
                title,
                display::WIDTH as u32 * scale,
                display::HEIGHT as u32 * scale,
            )
            .position_centered()
            .build()?;
        let canvas = window.into_canvas().build()?;

        let mut screen = Self { canvas, scale };
        screen.display(&Framebuffer::new())?;
        Ok(screen)
    }
}

impl DisplayCommands for SdlDisplay {
    fn display(&mut self, frame: &Framebuffer) -> io::Result<()> {
        let scale = self.scale;
        let pixels: Vec<Rect> = frame
            .rows()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &pixel)| pixel == 1)
                    .map(move |(x, _)| {
                        Rect::new(x as i32 * scale as i32, y as i32 * scale as i32, scale, scale)
                    })
            })
            .collect();

        self.canvas.set_draw_color(Color::BLACK);
        self.canvas.clear();
        if !pixels.is_empty() {
            self.canvas.set_draw_color(Color::WHITE);
            self.canvas.fill_rects(&pixels).map_err(sdl_error)?;
        }
        self.canvas.present();
        Ok(())
    }
}

/// Returns the keypad key for the sdl key.
fn keypad(key: Keycode) -> Option<u8> {
    // the printable keys are their own character
    char::from_u32(key as i32 as u32).and_then(keymap)
}

fn translate(event: Event) -> Option<InputEvent> {
    match event {
        Event::Quit { .. }
        | Event::KeyDown {
            keycode: Some(Keycode::Escape),
            ..
        } => Some(InputEvent::Quit),
        Event::KeyDown {
            keycode: Some(key),
            repeat: false,
            ..
        } => match keypad(key) {
            Some(key) => Some(InputEvent::Key { key, pressed: true }),
            None => {
                log::warn!("ignored key {:?}", key);
                None
            }
        },
        Event::KeyUp {
            keycode: Some(key), ..
        } => keypad(key).map(|key| InputEvent::Key {
            key,
            pressed: false,
        }),
        _ => None,
    }
}

pub struct SdlInput {
    events: EventPump,
}

impl SdlInput {
    pub fn new(sdl: &Sdl) -> anyhow::Result<Self> {
        let events = sdl
            .event_pump()
            .map_err(|err| anyhow!("No events available: {}", err))?;
        Ok(Self { events })
    }
}

impl InputCommands for SdlInput {
    fn poll(&mut self) -> io::Result<Option<InputEvent>> {
        while let Some(event) = self.events.poll_event() {
            if let Some(event) = translate(event) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn wait(&mut self) -> io::Result<InputEvent> {
        loop {
            if let Some(event) = translate(self.events.wait_event()) {
                return Ok(event);
            }
        }
    }
}

struct Tone(ToneGenerator);

impl AudioCallback for Tone {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        self.0.fill(out);
    }
}

/// The tone is played from the audio callback, there is nothing to do per cycle.
pub struct SdlSpeaker {
    _device: AudioDevice<Tone>,
}

impl SdlSpeaker {
    pub fn new(sdl: &Sdl, counter: BeepCounter) -> anyhow::Result<Self> {
        let audio = sdl.audio().map_err(|err| anyhow!("No audio available: {}", err))?;
        let desired = AudioSpecDesired {
            freq: Some(sound::SAMPLE_RATE as i32),
            channels: Some(1),
            samples: Some(sound::BUFFER_SIZE),
        };
        let device = audio
            .open_playback(None, &desired, |spec| {
                log::info!("audio opened with {:?}", spec);
                Tone(ToneGenerator::new(counter))
            })
            .map_err(|err| anyhow!("Unable to open the audio device: {}", err))?;
        device.resume();
        Ok(Self { _device: device })
    }
}

impl SpeakerCommands for SdlSpeaker {
    fn update(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs the machine in an sdl window until it is closed.
pub fn run<S: TimerCallback>(
    machine: ChipSet<S>,
    counter: BeepCounter,
    config: &Config,
    scale: u32,
) -> anyhow::Result<()> {
    let sdl = sdl2::init().map_err(|err| anyhow!("Unable to initialize sdl: {}", err))?;
    let display = SdlDisplay::new(&sdl, machine.get_name(), scale)?;
    let input = SdlInput::new(&sdl)?;
    let speaker = SdlSpeaker::new(&sdl, counter)?;

    chip::run(machine, display, input, speaker, config)?;
    Ok(())
}
