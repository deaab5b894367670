use std::io::{self, Stdout};

use chip::{
    definitions::display,
    devices::{DisplayCommands, Framebuffer},
};
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

/// Every character cell shows two pixels on top of each other.
const PIXELS_PER_CELL: usize = 2;

/// Turns two rows of pixels into a line of half block glyphs.
fn cell_row(top: &[u8], bottom: &[u8]) -> String {
    top.iter()
        .zip(bottom)
        .map(|(&top, &bottom)| match (top, bottom) {
            (1, 1) => '█',
            (1, _) => '▀',
            (_, 1) => '▄',
            _ => ' ',
        })
        .collect()
}

/// Renders the frame into the lines shown inside of the border.
pub fn frame_lines(frame: &Framebuffer) -> Vec<String> {
    let rows: Vec<&[u8]> = frame.rows().collect();
    rows.chunks(PIXELS_PER_CELL)
        .map(|pair| cell_row(pair[0], pair.get(1).copied().unwrap_or(&[])))
        .collect()
}

/// The screen drawn into the terminal with a border around it, the terminal is
/// switched into raw mode for as long as this lives.
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    title: String,
}

impl TerminalDisplay {
    pub fn new(name: &str) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;

        let mut screen = Self {
            terminal,
            title: format!("CHIP-8 {} (Esc to quit)", name),
        };
        // show the empty screen until the program draws
        screen.display(&Framebuffer::new())?;
        Ok(screen)
    }
}

impl DisplayCommands for TerminalDisplay {
    fn display(&mut self, frame: &Framebuffer) -> io::Result<()> {
        let lines: Vec<Spans> = frame_lines(frame).into_iter().map(Spans::from).collect();
        let title = self.title.as_str();

        self.terminal.draw(|f| {
            let size = f.size();
            // the border takes up one cell on every side
            let area = Rect::new(
                0,
                0,
                ((display::WIDTH + 2) as u16).min(size.width),
                ((display::HEIGHT / PIXELS_PER_CELL + 2) as u16).min(size.height),
            );
            let screen = Paragraph::new(lines)
                .style(Style::default().fg(Color::White).bg(Color::Black))
                .block(Block::default().title(title).borders(Borders::ALL));
            f.render_widget(screen, area);
        })?;
        Ok(())
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let res = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)
            .and_then(|_| terminal::disable_raw_mode());
        if let Err(err) = res {
            log::warn!("unable to restore the terminal: {}", err);
        }
    }
}
