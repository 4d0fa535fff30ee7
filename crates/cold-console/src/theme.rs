use cold_core::{ClusterStatus, NoticeLevel};
use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy, Debug)]
pub struct ConsoleTheme {
    pub bg: Color,
    pub surface: Color,
    pub border: Color,
    pub focus: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
    pub info: Color,
}

pub fn console_theme() -> ConsoleTheme {
    ConsoleTheme {
        bg: Color::Rgb(12, 16, 24),
        surface: Color::Rgb(20, 27, 40),
        border: Color::Rgb(71, 85, 105),
        focus: Color::Rgb(125, 211, 252),
        title: Color::Rgb(199, 210, 254),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(245, 158, 11),
        critical: Color::Rgb(239, 68, 68),
        info: Color::Rgb(59, 130, 246),
    }
}

impl ConsoleTheme {
    pub fn status_color(&self, status: &ClusterStatus) -> Color {
        match status {
            ClusterStatus::Running | ClusterStatus::Unpaused | ClusterStatus::Armed => self.ok,
            ClusterStatus::Paused | ClusterStatus::Disarmed => self.warn,
            ClusterStatus::Stopped => self.muted,
            ClusterStatus::Other(_) => self.critical,
        }
    }

    pub fn notice_color(&self, level: NoticeLevel) -> Color {
        match level {
            NoticeLevel::Info => self.info,
            NoticeLevel::Warn => self.warn,
            NoticeLevel::Error => self.critical,
        }
    }

    pub fn title_style(&self) -> Style {
        Style::new().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::new().fg(if focused { self.focus } else { self.border })
    }

    pub fn key_style(&self) -> Style {
        Style::new().fg(self.accent).add_modifier(Modifier::BOLD)
    }
}
