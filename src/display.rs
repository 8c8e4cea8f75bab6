//! Two-row status display.
//!
//! The view shown is chosen from the wall clock, not stored: each view
//! stays up for `period` seconds and the four views cycle through every
//! minute.  Lines are clipped and padded to the 16-column panel and
//! characters the panel ROM cannot show are replaced with `?`.

use heapless::String;

use crate::app::ports::{DisplayPort, WallTime};
use crate::control::actuator::Angle;
use crate::util::is_printable_ascii;

/// Panel width in characters.
pub const LCD_COLS: usize = 16;

/// One fixed-width display row.
pub type Line = String<LCD_COLS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Climate,
    Motion,
    Vent,
    Gas,
}

impl DisplayMode {
    /// `(second / period) % 4`.  A zero period is treated as one second.
    pub fn from_second(second: u8, period: u32) -> Self {
        match (u32::from(second) / period.max(1)) % 4 {
            0 => Self::Climate,
            1 => Self::Motion,
            2 => Self::Vent,
            _ => Self::Gas,
        }
    }
}

/// Everything a normal view can show, copied out of one tick.
#[derive(Debug, Clone, Copy)]
pub struct StatusView<'a> {
    pub temperature: f32,
    pub humidity: f32,
    pub motion: bool,
    pub gas: bool,
    pub angle: Angle,
    pub reason: &'a str,
}

/// Clip `text` to the panel width, pad with spaces, replace unprintables.
pub fn fit_line(text: &str) -> Line {
    let mut line = Line::new();
    for c in text.chars().take(LCD_COLS) {
        let c = if is_printable_ascii(c) { c } else { '?' };
        // Cannot overflow: at most LCD_COLS single-byte chars.
        let _ = line.push(c);
    }
    while line.push(' ').is_ok() {}
    line
}

fn fmt_line(args: core::fmt::Arguments<'_>) -> Line {
    fit_line(&std::fmt::format(args))
}

/// `Off` when closed, `On` when fully open, otherwise percent open.
pub fn vent_label(angle: Angle) -> Line {
    match angle.degrees() {
        0 => fit_line("Vent: Off"),
        180 => fit_line("Vent: On"),
        deg => fmt_line(format_args!("Vent: {}%", u32::from(deg) * 100 / 180)),
    }
}

/// Render the two lines of `mode`.
pub fn render(mode: DisplayMode, view: &StatusView<'_>, wall: WallTime) -> [Line; 2] {
    match mode {
        DisplayMode::Climate => [
            fmt_line(format_args!("Temp: {:.1}C", view.temperature)),
            fmt_line(format_args!(
                "Hum: {:.0}% {:02}:{:02}",
                view.humidity, wall.minute, wall.second
            )),
        ],
        DisplayMode::Motion => [
            fit_line("Motion Detector"),
            fit_line(if view.motion { "Status: ACTIVE" } else { "Status: Inactive" }),
        ],
        DisplayMode::Vent => [
            vent_label(view.angle),
            fmt_line(format_args!("Reason: {}", view.reason)),
        ],
        DisplayMode::Gas => [
            fit_line("Gas Detector"),
            fit_line(if view.gas { "Status: DANGER!" } else { "Status: Normal" }),
        ],
    }
}

/// Owns the display port and remembers what is on screen.
pub struct DisplayRotator {
    port: Box<dyn DisplayPort>,
    period: u32,
    shown: Option<[Line; 2]>,
}

impl DisplayRotator {
    pub fn new(port: Box<dyn DisplayPort>, period_secs: u32) -> Self {
        Self {
            port,
            period: period_secs,
            shown: None,
        }
    }

    /// Render the view for `wall` and return the mode shown.
    pub fn refresh(&mut self, view: &StatusView<'_>, wall: WallTime) -> DisplayMode {
        let mode = DisplayMode::from_second(wall.second, self.period);
        self.show(render(mode, view, wall));
        mode
    }

    pub fn show_degraded(&mut self) {
        self.message("Sensor Error!", "Check Connection");
    }

    pub fn show_startup(&mut self) {
        self.message("Smart Air System", "Initializing...");
    }

    pub fn show_shutdown(&mut self) {
        self.message("System Shutdown", "Goodbye!");
    }

    pub fn message(&mut self, top: &str, bottom: &str) {
        self.show([fit_line(top), fit_line(bottom)]);
    }

    /// Lines currently on the panel.
    pub fn shown(&self) -> Option<&[Line; 2]> {
        self.shown.as_ref()
    }

    fn show(&mut self, lines: [Line; 2]) {
        if self.shown.as_ref() == Some(&lines) {
            return;
        }
        for (row, line) in (0u8..).zip(lines.iter()) {
            self.port.write_line(row, line);
        }
        self.shown = Some(lines);
    }
}
