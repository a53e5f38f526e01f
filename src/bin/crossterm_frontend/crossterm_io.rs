use chip8_vm::emulator::output::{EmulatorOutput, Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use chip8_vm::emulator::{Command, Fault};

use crossterm::event::KeyCode;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use std::io::{self, stdout, Stdout, Write};

/// Each CHIP-8 pixel is two terminal cells wide, inside a one cell border.
const RIGHT: u16 = 2 * SCREEN_WIDTH as u16 + 1;
const BOTTOM: u16 = SCREEN_HEIGHT as u16 + 1;

/// The usual layout on the left-hand side of a QWERTY keyboard.
const CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x0),
    ('1', 0x1),
    ('2', 0x2),
    ('3', 0x3),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('a', 0x7),
    ('s', 0x8),
    ('d', 0x9),
    ('z', 0xA),
    ('c', 0xB),
    ('4', 0xC),
    ('r', 0xD),
    ('f', 0xE),
    ('v', 0xF),
];

pub fn term<T>(result: crossterm::Result<T>) -> io::Result<T> {
    result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

pub struct CrosstermOutput {
    stdout: Stdout,
}

impl CrosstermOutput {
    pub fn new() -> io::Result<CrosstermOutput> {
        let mut stdout = stdout();
        term(execute!(stdout, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All)))?;
        term(terminal::enable_raw_mode())?;

        for y in 0..=BOTTOM {
            for x in 0..=RIGHT {
                let c = match (x, y) {
                    (0, 0) => '┏',
                    (RIGHT, 0) => '┓',
                    (0, BOTTOM) => '┗',
                    (RIGHT, BOTTOM) => '┛',
                    (_, 0) | (_, BOTTOM) => '━',
                    (0, _) | (RIGHT, _) => '┃',
                    _ => continue,
                };
                term(queue!(stdout, cursor::MoveTo(x, y), Print(c)))?;
            }
        }
        stdout.flush()?;

        Ok(CrosstermOutput { stdout })
    }

    fn draw(&mut self, frame: &Framebuffer) -> io::Result<()> {
        for (y, row) in frame.rows().enumerate() {
            let line: String = row.iter().map(|c| if *c == 1 { "██" } else { "  " }).collect();
            term(queue!(self.stdout, cursor::MoveTo(1, y as u16 + 1), Print(line)))?;
        }
        self.stdout.flush()
    }

    fn draw_status(&mut self, paused: bool, fault: Option<Fault>) -> io::Result<()> {
        let mut status = String::from(if paused { "PAUSED  n: step  p: resume" } else { "p: pause" });
        status.push_str("  Enter: reset  Esc: quit");
        if let Some(fault) = fault {
            status.push_str(&format!("  | {}", fault));
        }
        term(queue!(
            self.stdout,
            cursor::MoveTo(0, BOTTOM + 1),
            Clear(ClearType::CurrentLine),
            Print(status)
        ))?;
        self.stdout.flush()
    }
}

impl Drop for CrosstermOutput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.stdout, LeaveAlternateScreen, cursor::Show);
    }
}

impl EmulatorOutput for CrosstermOutput {
    fn refresh(&mut self, frame: &Framebuffer) {
        if let Err(e) = self.draw(frame) {
            log::error!("Could not draw the screen: {}", e);
        }
    }

    fn status(&mut self, paused: bool, fault: Option<Fault>) {
        if let Err(e) = self.draw_status(paused, fault) {
            log::error!("Could not draw the status line: {}", e);
        }
    }
}

/// Map a terminal key to a CHIP-8 key, either by hex digit or by position.
pub fn key_to_u8(key: KeyCode, hex_keys: bool) -> Option<u8> {
    match key {
        KeyCode::Char(c) if hex_keys => c.to_digit(16).map(|c| c as u8),
        KeyCode::Char(c) => CONVENTIONAL_KEYMAP
            .iter()
            .find(|(k, _)| *k == c.to_ascii_lowercase())
            .map(|(_, key)| *key),
        _ => None,
    }
}

pub fn key_to_command(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Char('p') => Some(Command::TogglePause),
        KeyCode::Char('n') => Some(Command::Step),
        KeyCode::Enter => Some(Command::Reset),
        KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}
