//! Utilities for printing and everything related to "UI".

use term_painter::{Color, Style, ToStyle};

macro_rules! print_msg {
    ($kind:ident: $icon:literal => $fmt:literal $($args:tt)*) => {{
        use crate::ui::MsgKind;
        use term_painter::ToStyle;

        let icon_style = MsgKind::$kind.icon_style();
        icon_style.with(|| {
            print!("[{}] ", $icon);
        });

        let body_style = MsgKind::$kind.body_style();
        println!("{}", body_style.paint(format!($fmt $($args)*)));
    }};
}

macro_rules! info {
    () => { info!("") };
    ($($t:tt)*) => {
        print_msg!(Info: 'i' => $($t)*);
    };
}

macro_rules! error {
    () => { error!("") };
    ($($t:tt)*) => {
        print_msg!(Error: '!' => $($t)*);
    };
}

pub enum MsgKind {
    Error,
    Info,
}

impl MsgKind {
    pub fn icon_style(&self) -> Style {
        match self {
            MsgKind::Error => Color::Red.bold(),
            MsgKind::Info => Color::Blue.bold(),
        }
    }

    pub fn body_style(&self) -> Style {
        match self {
            MsgKind::Error => Color::BrightRed.to_style(),
            MsgKind::Info => Color::NotSet.to_style(),
        }
    }
}

/// The colored `passed`/`FAILED` cell of the result table.
pub fn status_cell(ok: bool) -> String {
    if ok {
        Color::Green.paint("passed").to_string()
    } else {
        Color::Red.bold().paint("FAILED").to_string()
    }
}
